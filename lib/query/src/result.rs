//! Query results and their provenance

use crate::intent::Intent;
use serde::Serialize;

/// Frequency of one value in a categorical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// What a successful query produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// Matching row indices, in row order
    Rows(Vec<usize>),
    /// Top value counts, most frequent first
    Counts(Vec<ValueCount>),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Rows(rows) => rows.is_empty(),
            Payload::Counts(counts) => counts.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Rows(rows) => rows.len(),
            Payload::Counts(counts) => counts.len(),
        }
    }
}

/// Where an answer came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    /// Intent that produced the payload
    pub intent: Intent,
    /// Column used by a rule-based intent; `None` for fallback answers
    pub column: Option<String>,
    /// Cosine similarity of the matched row, fallback answers only
    pub similarity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryResult {
    Match {
        payload: Payload,
        provenance: Provenance,
    },
    /// Terminal negative: nothing relevant was found
    NoMatch {
        reason: String,
        best_score: Option<f32>,
    },
}

impl QueryResult {
    pub fn is_match(&self) -> bool {
        matches!(self, QueryResult::Match { .. })
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            QueryResult::Match { payload, .. } => Some(payload),
            QueryResult::NoMatch { .. } => None,
        }
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        match self {
            QueryResult::Match { provenance, .. } => Some(provenance),
            QueryResult::NoMatch { .. } => None,
        }
    }

    /// Matched rows; empty for counts and for no-match results
    pub fn rows(&self) -> &[usize] {
        match self.payload() {
            Some(Payload::Rows(rows)) => rows,
            _ => &[],
        }
    }

    pub fn counts(&self) -> &[ValueCount] {
        match self.payload() {
            Some(Payload::Counts(counts)) => counts,
            _ => &[],
        }
    }
}
