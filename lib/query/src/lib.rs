//! # csvsense Query
//!
//! Question answering over a loaded table.
//!
//! ## Pipeline
//!
//! 1. [`IntentClassifier`] picks an [`Intent`] from the question text alone
//! 2. Columns are ranked by similarity between the question and column names
//! 3. [`QueryExecutor`] tries the ranked columns compatible with the intent
//! 4. If nothing answered, the nearest row by embedding is returned when it
//!    clears the similarity threshold
//!
//! [`QaEngine`] ties the steps together and [`AnswerView`] renders the result.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use csvsense_query::{EngineConfig, QaEngine};
//! use csvsense_schema::TableLoader;
//! use csvsense_similarity::HashingEmbedder;
//!
//! let table = TableLoader::default()
//!     .load_bytes(b"producto,precio\npan,10\nleche,20\nqueso,30\n")
//!     .unwrap();
//! let engine = QaEngine::new(Arc::new(HashingEmbedder::default()), EngineConfig::default()).unwrap();
//!
//! let answer = engine.ask(&table, "productos con precio mayor a 15").unwrap();
//! assert_eq!(answer.result.rows(), &[1, 2]);
//! ```

pub mod engine;
pub mod executor;
pub mod explain;
pub mod intent;
pub mod result;

pub use engine::{Answer, EngineConfig, QaEngine};
pub use executor::{is_compatible, ColumnOutcome, Execution, QueryExecutor, DEFAULT_TOP_N};
pub use explain::{AnswerStatus, AnswerView, RowView};
pub use intent::{Comparison, ExtremalScope, Intent, IntentClassifier, Matcher};
pub use result::{Payload, Provenance, QueryResult, ValueCount};
