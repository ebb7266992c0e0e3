//! # csvsense
//!
//! Ask natural-language questions about an uploaded CSV.
//!
//! Questions are classified into rule-based intents (numeric comparisons,
//! superlatives, date ranges, category counts, substring search). When no
//! intent produces a result, the row closest to the question by embedding
//! similarity answers instead, provided it is similar enough.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! csvsense serve --http-port 8080
//! curl -F file=@productos.csv http://localhost:8080/sessions
//! ```
//!
//! ### From the Command Line
//!
//! ```bash
//! csvsense ask --csv productos.csv "productos con precio mayor a 15"
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use csvsense::prelude::*;
//! use std::sync::Arc;
//!
//! let table = TableLoader::default()
//!     .load_bytes(b"nombre,fecha\nalta,2020-01-01\nbaja,2021-06-01\n")
//!     .unwrap();
//! let engine = QaEngine::new(Arc::new(HashingEmbedder::default()), EngineConfig::default()).unwrap();
//!
//! let answer = engine.ask(&table, "registros antes de 2021-01-01").unwrap();
//! assert_eq!(answer.result.rows(), &[0]);
//!
//! let view = AnswerView::from_answer(&answer, &table);
//! assert_eq!(view.column.as_deref(), Some("fecha"));
//! ```
//!
//! ## Crate Structure
//!
//! - `csvsense-core` - Table, columns, kinds, row filters, vectors, errors
//! - `csvsense-schema` - CSV loading and kind inference
//! - `csvsense-similarity` - Embedding providers, per-table cache, column ranking, fallback matching
//! - `csvsense-query` - Intent classification, execution, answer pipeline
//! - `csvsense-api` - Session-keyed REST API

// Re-export core types
pub use csvsense_core::{
    Column, ColumnKind, Error, Filter, FilterCondition, Result, RowFilter, Table, TableId, Vector,
};

// Re-export loading
pub use csvsense_schema::{InferenceConfig, TableLoader, TableSchema};

// Re-export embeddings
pub use csvsense_similarity::{
    EmbeddingBackend, EmbeddingCache, EmbeddingProvider, HashingEmbedder, ModelLoader,
    RankedColumn, SemanticMatcher,
};

// Re-export answering
pub use csvsense_query::{
    Answer, AnswerStatus, AnswerView, EngineConfig, Intent, IntentClassifier, Payload, QaEngine,
    QueryExecutor, QueryResult,
};

// Re-export API
pub use csvsense_api::{RestApi, SessionStore};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Answer, AnswerView, Column, ColumnKind, EmbeddingBackend, EmbeddingProvider, EngineConfig,
        Error, HashingEmbedder, Intent, ModelLoader, QaEngine, QueryResult, Result, RestApi,
        SessionStore, Table, TableLoader, TableSchema,
    };
}
