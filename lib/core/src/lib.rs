//! # csvsense Core
//!
//! Core library for csvsense.
//!
//! This crate provides the fundamental data structures shared by every other
//! csvsense crate:
//!
//! - [`Table`] - An ordered set of named columns, loaded once per upload
//! - [`Column`] - Raw cells plus lazily parsed float and timestamp views
//! - [`ColumnKind`] - Inferred semantic kind (numeric, datetime, categorical, free text)
//! - [`Vector`] - Dense embedding vector with cosine similarity
//! - [`RowFilter`] - Predicates over rows, used by the query executor
//!
//! ## Example
//!
//! ```rust
//! use csvsense_core::{Column, ColumnKind, FilterCondition, RowFilter, Table};
//!
//! let precio = Column::new(
//!     "precio",
//!     ColumnKind::Numeric,
//!     vec![Some("10".into()), Some("20".into()), Some("30".into())],
//! );
//! let table = Table::new(vec![precio]).unwrap();
//!
//! let filter = RowFilter::new(FilterCondition::GreaterThan { column: 0, value: 15.0 });
//! assert_eq!(table.select(&filter), vec![1, 2]);
//! ```

pub mod error;
pub mod filter;
pub mod table;
pub mod value;
pub mod vector;

pub use error::{Error, Result};
pub use filter::{Filter, FilterCondition, RowFilter};
pub use table::{Column, ColumnKind, Table, TableId, ROW_TEXT_DELIMITER};
pub use vector::Vector;
