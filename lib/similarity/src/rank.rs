//! Column ranking
//!
//! Orders a table's columns by how close their names are to the question.

use crate::distance::cosine_scores;
use csvsense_core::{Table, Vector};
use serde::Serialize;

/// A column with its relevance to the question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedColumn {
    /// Position of the column in the table
    pub index: usize,
    pub name: String,
    pub score: f32,
}

/// Rank every column of `table` by descending cosine similarity between the
/// question embedding and the column-name embeddings.
///
/// The result is a permutation of the table's columns. Equal scores keep
/// table order. A column without an embedding scores 0.0.
pub fn rank_columns(question: &Vector, column_embeddings: &[Vector], table: &Table) -> Vec<RankedColumn> {
    let scores = cosine_scores(question, column_embeddings);

    let mut ranked: Vec<RankedColumn> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| RankedColumn {
            index,
            name: column.name().to_string(),
            score: scores.get(index).copied().unwrap_or(0.0),
        })
        .collect();

    // stable: ties stay in column order
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}
