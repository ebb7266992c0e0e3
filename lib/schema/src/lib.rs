//! # csvsense Schema
//!
//! Table loading and type inference.
//!
//! ## Overview
//!
//! An uploaded CSV is parsed into a [`csvsense_core::Table`] and every column
//! gets an inferred [`csvsense_core::ColumnKind`]:
//!
//! 1. **Numeric** - every non-null value parses as a float
//! 2. **Datetime** - enough non-null values parse as dates
//! 3. **Categorical** - few distinct values relative to the row count
//! 4. **FreeText** - everything else
//!
//! ## Example
//!
//! ```rust
//! use csvsense_schema::{TableLoader, TableSchema};
//! use csvsense_core::ColumnKind;
//!
//! let csv = "producto,precio\npan,10\nleche,20\n";
//! let table = TableLoader::default().load_bytes(csv.as_bytes()).unwrap();
//!
//! let schema = TableSchema::describe(&table);
//! assert_eq!(schema.columns_of_kind(ColumnKind::Numeric), vec!["precio"]);
//! ```

pub mod loader;
pub mod schema;

pub use loader::TableLoader;
pub use schema::{infer_kind, ColumnProfile, InferenceConfig, TableSchema};
