//! Semantic fallback matching
//!
//! Nearest-neighbor answer path used when no rule-based intent produced a
//! result: the row whose embedding is closest to the question wins, if it is
//! close enough.

use crate::distance::cosine_scores;
use csvsense_core::{Error, Result, Vector};
use serde::Serialize;

/// Default minimum cosine similarity for a fallback answer
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.45;

/// Result of a fallback search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FallbackOutcome {
    /// The closest row cleared the threshold
    Matched { row: usize, score: f32 },
    /// Nothing cleared the threshold; `best_score` is `None` for an empty table
    LowConfidence { best_score: Option<f32> },
}

#[derive(Debug, Clone, Copy)]
pub struct SemanticMatcher {
    threshold: f32,
}

impl Default for SemanticMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl SemanticMatcher {
    pub fn new(threshold: f32) -> Result<Self> {
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidConfig(format!(
                "similarity threshold must be within [-1, 1], got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Row with maximal similarity; the first one wins ties
    pub fn best_row(&self, question: &Vector, rows: &[Vector]) -> Option<(usize, f32)> {
        cosine_scores(question, rows)
            .into_iter()
            .enumerate()
            .fold(None, |best, (row, score)| match best {
                Some((_, top)) if score <= top => best,
                _ => Some((row, score)),
            })
    }

    pub fn match_rows(&self, question: &Vector, rows: &[Vector]) -> FallbackOutcome {
        match self.best_row(question, rows) {
            Some((row, score)) if score >= self.threshold => FallbackOutcome::Matched { row, score },
            Some((_, score)) => FallbackOutcome::LowConfidence {
                best_score: Some(score),
            },
            None => FallbackOutcome::LowConfidence { best_score: None },
        }
    }
}
