use crate::filter::Filter;
use crate::value::{parse_datetime, parse_number};
use crate::{Error, Result};
use ahash::AHashSet;
use chrono::NaiveDateTime;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delimiter used to flatten a row into its RowText
pub const ROW_TEXT_DELIMITER: &str = " | ";

/// Identity of a loaded table. A reload always produces a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(Uuid);

impl TableId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TableId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inferred semantic kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Datetime,
    Categorical,
    #[serde(rename = "free_text")]
    FreeText,
}

impl ColumnKind {
    /// Categorical and free-text columns keep their values as strings
    pub fn is_text(&self) -> bool {
        matches!(self, ColumnKind::Categorical | ColumnKind::FreeText)
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Datetime => "datetime",
            ColumnKind::Categorical => "categorical",
            ColumnKind::FreeText => "free_text",
        };
        f.write_str(s)
    }
}

/// A named column of raw cells plus lazily parsed typed views.
///
/// `None` cells are nulls. The kind is fixed at construction.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    cells: Vec<Option<String>>,
    numbers: OnceCell<Vec<Option<f64>>>,
    datetimes: OnceCell<Vec<Option<NaiveDateTime>>>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, cells: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            kind,
            cells,
            numbers: OnceCell::new(),
            datetimes: OnceCell::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }

    /// Raw cell at `row`, `None` for nulls and out-of-range rows
    #[inline]
    pub fn cell(&self, row: usize) -> Option<&str> {
        self.cells.get(row).and_then(|c| c.as_deref())
    }

    /// String form of a cell; nulls render as the empty string
    #[inline]
    pub fn text(&self, row: usize) -> &str {
        self.cell(row).unwrap_or("")
    }

    /// Float view of the column, parsed on first access
    pub fn numbers(&self) -> &[Option<f64>] {
        self.numbers.get_or_init(|| {
            self.cells
                .iter()
                .map(|c| c.as_deref().and_then(parse_number))
                .collect()
        })
    }

    /// Timestamp view of the column, parsed on first access
    pub fn datetimes(&self) -> &[Option<NaiveDateTime>] {
        self.datetimes.get_or_init(|| {
            self.cells
                .iter()
                .map(|c| c.as_deref().and_then(parse_datetime))
                .collect()
        })
    }

    pub fn non_null_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Number of distinct non-null values
    pub fn distinct_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<AHashSet<_>>()
            .len()
    }
}

/// An ordered set of equally long, uniquely named columns.
///
/// Rows are identified by index and never reordered.
#[derive(Debug, Clone)]
pub struct Table {
    id: TableId,
    columns: Vec<Column>,
    row_count: usize,
    row_texts: OnceCell<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::EmptyTable);
        }

        let row_count = columns[0].len();
        let mut seen = AHashSet::new();
        for column in &columns {
            if column.len() != row_count {
                return Err(Error::Parse(format!(
                    "column '{}' has {} values, expected {}",
                    column.name(),
                    column.len(),
                    row_count
                )));
            }
            if !seen.insert(column.name()) {
                return Err(Error::Parse(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
        }

        Ok(Self {
            id: TableId::new(),
            columns,
            row_count,
            row_texts: OnceCell::new(),
        })
    }

    #[inline]
    pub fn id(&self) -> TableId {
        self.id
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[inline]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_by_name(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Cells of one row in column order
    pub fn row(&self, row: usize) -> Vec<Option<&str>> {
        self.columns.iter().map(|c| c.cell(row)).collect()
    }

    /// Per-row text used for row embeddings, built once per table
    pub fn row_texts(&self) -> &[String] {
        self.row_texts.get_or_init(|| {
            (0..self.row_count)
                .map(|row| {
                    self.columns
                        .iter()
                        .map(|c| c.text(row))
                        .collect::<Vec<_>>()
                        .join(ROW_TEXT_DELIMITER)
                })
                .collect()
        })
    }

    /// Indices of rows accepted by the filter, in row order
    pub fn select(&self, filter: &dyn Filter) -> Vec<usize> {
        (0..self.row_count)
            .filter(|&row| filter.matches(self, row))
            .collect()
    }
}
