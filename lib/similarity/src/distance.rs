//! Feature hashing and similarity scoring
//!
//! Text is turned into a fixed-size vector by hashing character trigrams
//! and whole words into buckets. Scores are cosine similarities in [-1, 1].

use ahash::AHashSet;
use csvsense_core::Vector;
use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Candidate sets at least this large are scored in parallel
const PARALLEL_SCORING_THRESHOLD: usize = 1024;

/// Cosine similarity of `query` against every candidate, in candidate order
pub fn cosine_scores(query: &Vector, candidates: &[Vector]) -> Vec<f32> {
    if candidates.len() >= PARALLEL_SCORING_THRESHOLD {
        candidates
            .par_iter()
            .map(|c| query.cosine_similarity(c))
            .collect()
    } else {
        candidates
            .iter()
            .map(|c| query.cosine_similarity(c))
            .collect()
    }
}

/// Generate character trigrams from a string
pub fn generate_trigrams(s: &str) -> AHashSet<String> {
    let padded = format!("  {}  ", s);
    let chars: Vec<char> = padded.chars().collect();

    if chars.len() < 3 {
        return AHashSet::new();
    }

    chars.windows(3)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

/// Split on anything that is not a letter or digit
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
}

fn bucket(feature: &str, dim: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    feature.hash(&mut hasher);
    (hasher.finish() as usize) % dim
}

/// Hash a string to a fixed-size, L2-normalized vector.
///
/// Lowercases first, so case never changes the result. An empty or
/// whitespace-only text maps to the zero vector.
pub fn hash_text_to_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dim];
    if dim == 0 {
        return vector;
    }

    let normalized = text.to_lowercase();
    let tokens: Vec<&str> = words(&normalized).collect();
    if tokens.is_empty() {
        return vector;
    }

    for trigram in generate_trigrams(&tokens.join(" ")) {
        vector[bucket(&trigram, dim)] += 1.0;
    }

    // Words contribute more than trigrams
    for word in &tokens {
        vector[bucket(word, dim)] += 2.0;
    }

    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for v in &mut vector {
            *v /= magnitude;
        }
    }

    vector
}
