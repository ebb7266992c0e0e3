//! Explainable answer views
//!
//! Turns an [`Answer`] into a self-describing structure for display: the
//! matched rows materialized as column/value maps, value counts, which
//! column and intent produced them, and a one-line summary.

use crate::engine::Answer;
use crate::intent::{ExtremalScope, Intent};
use crate::result::{Payload, QueryResult, ValueCount};
use csvsense_core::Table;
use csvsense_similarity::RankedColumn;
use serde::Serialize;
use serde_json::{Map, Value};

/// How the presentation layer should render an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// Success banner plus a sub-table
    Rows,
    /// Informational value counts
    Counts,
    /// "No relevant information found" warning
    NotFound,
}

/// A matched row keyed by column name, in column order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub index: usize,
    pub values: Map<String, Value>,
}

impl RowView {
    pub fn from_table(table: &Table, index: usize) -> Self {
        let values = table
            .columns()
            .iter()
            .map(|c| {
                let value = c.cell(index).map(|v| Value::String(v.to_string())).unwrap_or(Value::Null);
                (c.name().to_string(), value)
            })
            .collect();
        Self { index, values }
    }
}

/// Display form of an answer
#[derive(Debug, Clone, Serialize)]
pub struct AnswerView {
    pub question: String,
    pub status: AnswerStatus,
    /// One-line summary of what happened
    pub message: String,
    /// Intent picked by the classifier
    pub intent: Intent,
    /// Name of the intent that actually produced the payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_by: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<RowView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub counts: Vec<ValueCount>,
    pub ranked_columns: Vec<RankedColumn>,
}

impl AnswerView {
    pub fn from_answer(answer: &Answer, table: &Table) -> Self {
        let mut view = Self {
            question: answer.question.clone(),
            status: AnswerStatus::NotFound,
            message: summarize(&answer.result),
            intent: answer.intent.clone(),
            answered_by: None,
            column: None,
            similarity: None,
            rows: Vec::new(),
            counts: Vec::new(),
            ranked_columns: answer.ranked_columns.clone(),
        };

        if let QueryResult::Match { payload, provenance } = &answer.result {
            view.answered_by = Some(provenance.intent.name());
            view.column = provenance.column.clone();
            view.similarity = provenance.similarity;
            match payload {
                Payload::Rows(rows) => {
                    view.status = AnswerStatus::Rows;
                    view.rows = rows.iter().map(|&row| RowView::from_table(table, row)).collect();
                }
                Payload::Counts(counts) => {
                    view.status = AnswerStatus::Counts;
                    view.counts = counts.clone();
                }
            }
        }

        view
    }
}

fn summarize(result: &QueryResult) -> String {
    let (payload, provenance) = match result {
        QueryResult::Match { payload, provenance } => (payload, provenance),
        QueryResult::NoMatch { .. } => return "No relevant information found".to_string(),
    };

    let column = provenance.column.as_deref().unwrap_or("?");
    let n = payload.len();
    match &provenance.intent {
        Intent::NumericComparison { op, threshold } => {
            format!("Filtered '{}' {} {}: {} results", column, op, threshold, n)
        }
        Intent::Extremal { max, scope: ExtremalScope::Numeric } => {
            let which = if *max { "highest" } else { "lowest" };
            format!("Row with the {} value in numeric column '{}'", which, column)
        }
        Intent::Extremal { scope: ExtremalScope::TextLength, .. } => {
            format!("Row with the longest text in '{}'", column)
        }
        Intent::DateRange { before, date } => {
            let which = if *before { "before" } else { "after" };
            format!("Rows dated {} {} in '{}': {} results", which, date.date(), column, n)
        }
        Intent::CategoricalCount => format!("Category counts in '{}'", column),
        Intent::SubstringSearch { .. } => format!("Matches found in '{}': {} results", column, n),
        Intent::SemanticFallback => match provenance.similarity {
            Some(score) => format!("Most similar row (similarity {:.2})", score),
            None => "Most similar row".to_string(),
        },
    }
}
