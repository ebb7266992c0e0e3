// Row filters over typed column views
use crate::Table;
use chrono::NaiveDateTime;

pub trait Filter {
    fn matches(&self, table: &Table, row: usize) -> bool;
}

pub struct RowFilter {
    condition: FilterCondition,
}

/// Conditions address columns by index. Null cells never satisfy a
/// comparison or a containment test.
#[derive(Debug, Clone)]
pub enum FilterCondition {
    GreaterThan { column: usize, value: f64 },
    LessThan { column: usize, value: f64 },
    Before { column: usize, at: NaiveDateTime },
    After { column: usize, at: NaiveDateTime },
    /// `needle` is stored lowercased; see [`FilterCondition::contains`]
    Contains { column: usize, needle: String },
    And(Vec<FilterCondition>),
    Or(Vec<FilterCondition>),
    Not(Box<FilterCondition>),
}

impl FilterCondition {
    /// Case-insensitive substring condition
    pub fn contains(column: usize, needle: &str) -> Self {
        FilterCondition::Contains {
            column,
            needle: needle.to_lowercase(),
        }
    }
}

impl RowFilter {
    pub fn new(condition: FilterCondition) -> Self {
        Self { condition }
    }

    pub fn condition(&self) -> &FilterCondition {
        &self.condition
    }

    fn number_at(table: &Table, column: usize, row: usize) -> Option<f64> {
        table
            .column(column)
            .and_then(|c| c.numbers().get(row).copied().flatten())
    }

    fn datetime_at(table: &Table, column: usize, row: usize) -> Option<NaiveDateTime> {
        table
            .column(column)
            .and_then(|c| c.datetimes().get(row).copied().flatten())
    }

    fn matches_condition(condition: &FilterCondition, table: &Table, row: usize) -> bool {
        match condition {
            FilterCondition::GreaterThan { column, value } => {
                Self::number_at(table, *column, row)
                    .map(|v| v > *value)
                    .unwrap_or(false)
            }
            FilterCondition::LessThan { column, value } => {
                Self::number_at(table, *column, row)
                    .map(|v| v < *value)
                    .unwrap_or(false)
            }
            FilterCondition::Before { column, at } => {
                Self::datetime_at(table, *column, row)
                    .map(|v| v < *at)
                    .unwrap_or(false)
            }
            FilterCondition::After { column, at } => {
                Self::datetime_at(table, *column, row)
                    .map(|v| v > *at)
                    .unwrap_or(false)
            }
            FilterCondition::Contains { column, needle } => {
                table
                    .column(*column)
                    .and_then(|c| c.cell(row))
                    .map(|v| v.to_lowercase().contains(needle.as_str()))
                    .unwrap_or(false)
            }
            FilterCondition::And(conditions) => {
                conditions.iter().all(|c| Self::matches_condition(c, table, row))
            }
            FilterCondition::Or(conditions) => {
                conditions.iter().any(|c| Self::matches_condition(c, table, row))
            }
            FilterCondition::Not(condition) => {
                !Self::matches_condition(condition, table, row)
            }
        }
    }
}

impl Filter for RowFilter {
    fn matches(&self, table: &Table, row: usize) -> bool {
        Self::matches_condition(&self.condition, table, row)
    }
}
