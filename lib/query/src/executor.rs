//! Query execution over ranked candidate columns
//!
//! The executor walks the ranked columns, skips those whose kind cannot serve
//! the intent, and stops at the first column that yields a non-empty result.
//! Per-column failures are values ([`ColumnOutcome`]), never errors.

use crate::intent::{Comparison, ExtremalScope, Intent};
use crate::result::{Payload, ValueCount};
use ahash::AHashMap;
use chrono::NaiveDateTime;
use csvsense_core::{Column, ColumnKind, FilterCondition, RowFilter, Table};
use csvsense_similarity::RankedColumn;
use tracing::{debug, warn};

/// Default number of value counts returned for a categorical question
pub const DEFAULT_TOP_N: usize = 5;

/// Outcome of trying one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOutcome {
    Hit(Payload),
    /// Compatible column, nothing matched
    Empty,
    /// The column's kind or contents cannot serve the intent
    Incompatible,
}

/// First successful column and what it produced
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub column: usize,
    pub payload: Payload,
}

/// Whether a column of `kind` can answer `intent`
pub fn is_compatible(intent: &Intent, kind: ColumnKind) -> bool {
    match intent {
        Intent::NumericComparison { .. } => kind == ColumnKind::Numeric,
        Intent::Extremal { scope: ExtremalScope::Numeric, .. } => kind == ColumnKind::Numeric,
        Intent::Extremal { scope: ExtremalScope::TextLength, .. } => kind.is_text(),
        Intent::DateRange { .. } => kind == ColumnKind::Datetime,
        Intent::CategoricalCount => kind == ColumnKind::Categorical,
        Intent::SubstringSearch { .. } => true,
        Intent::SemanticFallback => false,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor {
    top_n: usize,
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self { top_n: DEFAULT_TOP_N }
    }
}

impl QueryExecutor {
    pub fn new(top_n: usize) -> Self {
        Self { top_n: top_n.max(1) }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Try ranked columns in order; `None` when no column produced a result
    pub fn execute(&self, intent: &Intent, ranked: &[RankedColumn], table: &Table) -> Option<Execution> {
        for candidate in ranked {
            let Some(column) = table.column(candidate.index) else {
                continue;
            };

            match self.try_column(intent, candidate.index, column, table) {
                ColumnOutcome::Hit(payload) => {
                    debug!(
                        intent = intent.name(),
                        column = column.name(),
                        results = payload.len(),
                        "Column answered"
                    );
                    return Some(Execution {
                        column: candidate.index,
                        payload,
                    });
                }
                outcome => {
                    debug!(intent = intent.name(), column = column.name(), ?outcome, "Column skipped");
                }
            }
        }

        debug!(intent = intent.name(), "No column produced a result");
        None
    }

    /// Apply `intent` to a single column
    pub fn try_column(&self, intent: &Intent, index: usize, column: &Column, table: &Table) -> ColumnOutcome {
        if !is_compatible(intent, column.kind()) {
            return ColumnOutcome::Incompatible;
        }

        match intent {
            Intent::NumericComparison { op, threshold } => {
                let condition = match op {
                    Comparison::GreaterThan => FilterCondition::GreaterThan { column: index, value: *threshold },
                    Comparison::LessThan => FilterCondition::LessThan { column: index, value: *threshold },
                };
                rows_outcome(table.select(&RowFilter::new(condition)))
            }
            Intent::Extremal { max, scope: ExtremalScope::Numeric } => {
                match extreme_row(column.numbers().iter().copied(), *max) {
                    Some(row) => ColumnOutcome::Hit(Payload::Rows(vec![row])),
                    // entirely null
                    None => ColumnOutcome::Empty,
                }
            }
            // longest text wins whichever direction was asked
            Intent::Extremal { scope: ExtremalScope::TextLength, .. } => {
                if column.non_null_count() == 0 {
                    return ColumnOutcome::Empty;
                }
                // null counts as length 0
                let lengths = column
                    .cells()
                    .iter()
                    .map(|cell| Some(cell.as_deref().map_or(0, |t| t.chars().count()) as f64));
                match extreme_row(lengths, true) {
                    Some(row) => ColumnOutcome::Hit(Payload::Rows(vec![row])),
                    None => ColumnOutcome::Empty,
                }
            }
            Intent::DateRange { before, date } => self.date_range(index, column, table, *before, *date),
            Intent::CategoricalCount => self.value_counts(column),
            Intent::SubstringSearch { needle } => {
                let filter = RowFilter::new(FilterCondition::contains(index, needle));
                rows_outcome(table.select(&filter))
            }
            Intent::SemanticFallback => ColumnOutcome::Incompatible,
        }
    }

    fn date_range(
        &self,
        index: usize,
        column: &Column,
        table: &Table,
        before: bool,
        date: NaiveDateTime,
    ) -> ColumnOutcome {
        let parsed = column.datetimes().iter().filter(|d| d.is_some()).count();
        let unparsed = column.non_null_count() - parsed;
        if parsed == 0 {
            return ColumnOutcome::Incompatible;
        }
        if unparsed > 0 {
            warn!(column = column.name(), unparsed, "Some cells could not be read as dates");
        }

        let condition = if before {
            FilterCondition::Before { column: index, at: date }
        } else {
            FilterCondition::After { column: index, at: date }
        };
        rows_outcome(table.select(&RowFilter::new(condition)))
    }

    fn value_counts(&self, column: &Column) -> ColumnOutcome {
        let mut positions: AHashMap<&str, usize> = AHashMap::new();
        let mut counts: Vec<ValueCount> = Vec::new();

        for value in column.cells().iter().flatten() {
            match positions.get(value.as_str()) {
                Some(&pos) => counts[pos].count += 1,
                None => {
                    positions.insert(value.as_str(), counts.len());
                    counts.push(ValueCount {
                        value: value.clone(),
                        count: 1,
                    });
                }
            }
        }

        if counts.len() < 2 {
            return ColumnOutcome::Empty;
        }

        // stable: equal counts keep first-appearance order
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts.truncate(self.top_n);
        ColumnOutcome::Hit(Payload::Counts(counts))
    }
}

fn rows_outcome(rows: Vec<usize>) -> ColumnOutcome {
    if rows.is_empty() {
        ColumnOutcome::Empty
    } else {
        ColumnOutcome::Hit(Payload::Rows(rows))
    }
}

/// Index of the first maximal (or minimal) non-null value
fn extreme_row(values: impl Iterator<Item = Option<f64>>, max: bool) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (row, value) in values.enumerate() {
        let Some(value) = value else { continue };
        let better = match best {
            None => true,
            Some((_, current)) if max => value > current,
            Some((_, current)) => value < current,
        };
        if better {
            best = Some((row, value));
        }
    }
    best.map(|(row, _)| row)
}
