//! Column kind inference
//!
//! Decides the semantic kind of each column from its values alone:
//! numeric parse rate, datetime parse rate and distinct-value ratio.
//! The result is summarized per table as a [`TableSchema`].

use ahash::AHashSet;
use csvsense_core::value::{parse_datetime, parse_number};
use csvsense_core::{ColumnKind, Error, Result, Table};
use serde::{Deserialize, Serialize};

/// Thresholds used by [`infer_kind`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct InferenceConfig {
    /// Minimum share of non-null values that must parse as dates
    #[serde(default = "default_datetime_confidence")]
    pub datetime_confidence: f32,

    /// A text column is categorical iff distinct values < ratio * rows
    #[serde(default = "default_categorical_ratio")]
    pub categorical_ratio: f32,
}

fn default_datetime_confidence() -> f32 {
    0.9
}

fn default_categorical_ratio() -> f32 {
    0.5
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            datetime_confidence: default_datetime_confidence(),
            categorical_ratio: default_categorical_ratio(),
        }
    }
}

impl InferenceConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.datetime_confidence > 0.0 && self.datetime_confidence <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "datetime_confidence must be in (0, 1], got {}",
                self.datetime_confidence
            )));
        }
        if !(self.categorical_ratio > 0.0 && self.categorical_ratio <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "categorical_ratio must be in (0, 1], got {}",
                self.categorical_ratio
            )));
        }
        Ok(())
    }
}

/// Infer the kind of a column from its cells (`None` = null).
///
/// Order: numeric, datetime, categorical, free text. A column with no
/// non-null values is numeric, mirroring an all-NaN float column.
pub fn infer_kind(cells: &[Option<String>], config: &InferenceConfig) -> ColumnKind {
    let values: Vec<&str> = cells.iter().flatten().map(String::as_str).collect();

    if values.iter().all(|v| parse_number(v).is_some()) {
        return ColumnKind::Numeric;
    }

    let parsed_dates = values.iter().filter(|v| parse_datetime(v).is_some()).count();
    let date_rate = parsed_dates as f32 / values.len() as f32;
    if date_rate >= config.datetime_confidence {
        return ColumnKind::Datetime;
    }

    let distinct = values.iter().collect::<AHashSet<_>>().len();
    if (distinct as f64) < f64::from(config.categorical_ratio) * cells.len() as f64 {
        ColumnKind::Categorical
    } else {
        ColumnKind::FreeText
    }
}

/// Summary of one loaded column
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub non_null: usize,
    pub distinct: usize,
}

/// Inferred schema of a loaded table, for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableSchema {
    /// Schema version for future compatibility
    #[serde(default = "default_version")]
    pub version: u32,
    pub row_count: usize,
    pub columns: Vec<ColumnProfile>,
}

fn default_version() -> u32 {
    1
}

impl TableSchema {
    pub fn describe(table: &Table) -> Self {
        let columns = table
            .columns()
            .iter()
            .map(|c| ColumnProfile {
                name: c.name().to_string(),
                kind: c.kind(),
                non_null: c.non_null_count(),
                distinct: c.distinct_count(),
            })
            .collect();

        Self {
            version: default_version(),
            row_count: table.row_count(),
            columns,
        }
    }

    /// Names of the columns with the given kind, in table order
    pub fn columns_of_kind(&self, kind: ColumnKind) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.as_str())
            .collect()
    }
}
