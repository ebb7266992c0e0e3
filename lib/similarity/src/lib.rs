//! # csvsense Similarity
//!
//! Embedding and nearest-neighbor layer for csvsense.
//!
//! - [`EmbeddingProvider`] / [`ModelLoader`] - text to vector, built once per process
//! - [`EmbeddingCache`] - column-name and row embeddings computed once per table
//! - [`rank_columns`] - orders columns by relevance to a question
//! - [`SemanticMatcher`] - thresholded nearest-row fallback
//!
//! ## Example
//!
//! ```rust
//! use csvsense_similarity::{EmbeddingProvider, HashingEmbedder, SemanticMatcher, FallbackOutcome};
//!
//! let embedder = HashingEmbedder::new(128);
//! let rows = embedder
//!     .encode(&["pan integral | 2.5".to_string(), "leche entera | 1.2".to_string()])
//!     .unwrap();
//! let question = embedder.encode_one("leche entera").unwrap();
//!
//! let outcome = SemanticMatcher::default().match_rows(&question, &rows);
//! assert!(matches!(outcome, FallbackOutcome::Matched { row: 1, .. }));
//! ```

pub mod cache;
pub mod distance;
pub mod embedder;
pub mod fallback;
pub mod rank;

pub use cache::{EmbeddingCache, TableEmbeddings};
pub use distance::{cosine_scores, hash_text_to_vector};
pub use embedder::{
    check_dimensions, EmbeddingBackend, EmbeddingProvider, HashingEmbedder, ModelLoader,
    DEFAULT_EMBEDDING_DIM, DEFAULT_MODEL,
};
#[cfg(feature = "fastembed")]
pub use embedder::FastEmbedProvider;
pub use fallback::{FallbackOutcome, SemanticMatcher, DEFAULT_SIMILARITY_THRESHOLD};
pub use rank::{rank_columns, RankedColumn};
