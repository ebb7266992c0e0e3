//! Intent classification
//!
//! A question is matched against an ordered table of lexical matchers. The
//! first matcher that accepts the question decides the [`Intent`]; the table
//! schema is never consulted here, column relevance is resolved later by the
//! ranker.
//!
//! Priority order:
//!
//! 1. `numeric_comparison` - "precio mayor a 15"
//! 2. `extremal` - "cuál es el producto más caro"
//! 3. `date_range` - "registros antes de 2021-01-01"
//! 4. `categorical_count` - "qué tipos de nombre hay"
//! 5. `substring_search` - any other non-empty question
//!
//! An empty question is a [`Intent::SemanticFallback`].

use chrono::NaiveDateTime;
use csvsense_core::value::parse_iso_date;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::debug;

static NUMERIC_COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(mayor|menor|m[aá]s|menos|superior|inferior)\s+(?:(?:a|de|que)\s+)?(\d+(?:[.,]\d+)?)")
        .expect("numeric comparison pattern")
});

static EXTREMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:cu[aá]l(?:es)?|qu[eé])\s+(?:(?:es|fue|son|fueron)\s+)?(?:(?:el|la|los|las)\s+)?(?:\w+\s+)*?(?:m[aá]s|mayor|menos|menor)\b",
    )
    .expect("extremal pattern")
});

static DATE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(antes|despu[eé]s)\s+de\s+(\d{4}-\d{2}-\d{2})\b").expect("date range pattern")
});

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word pattern"));

/// Words that turn a superlative into a maximum
const MAX_KEYWORDS: &[&str] = &[
    "más", "mas", "mayor", "alto", "alta", "caro", "cara", "grande", "pesado", "calorías",
    "cantidad",
];

/// Terms that make a superlative about text length
const LENGTH_KEYWORDS: &[&str] = &["largo", "larga", "extenso", "extensa", "longitud"];

/// Phrases that ask for counts or category listings
const COUNT_KEYWORDS: &[&str] = &[
    "cuántos",
    "cuántas",
    "cuantos",
    "cuantas",
    "cantidad de",
    "número de",
    "numero de",
    "cuenta",
    "listado de",
    "qué tipos",
    "que tipos",
    "qué clases",
    "categorías",
    "categorias",
    "tipos",
    "clases",
    "lista de",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::GreaterThan => f.write_str(">"),
            Comparison::LessThan => f.write_str("<"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremalScope {
    Numeric,
    TextLength,
}

/// Classified type of a question
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    NumericComparison { op: Comparison, threshold: f64 },
    Extremal { max: bool, scope: ExtremalScope },
    DateRange { before: bool, date: NaiveDateTime },
    CategoricalCount,
    SubstringSearch { needle: String },
    SemanticFallback,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::NumericComparison { .. } => "numeric_comparison",
            Intent::Extremal { .. } => "extremal",
            Intent::DateRange { .. } => "date_range",
            Intent::CategoricalCount => "categorical_count",
            Intent::SubstringSearch { .. } => "substring_search",
            Intent::SemanticFallback => "semantic_fallback",
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Intent::SemanticFallback)
    }
}

/// Builds an intent from a lowercased, trimmed question, or declines
pub type BuildIntent = fn(&str) -> Option<Intent>;

/// A named entry of the classifier's matcher table
#[derive(Clone, Copy)]
pub struct Matcher {
    pub name: &'static str,
    pub build: BuildIntent,
}

fn numeric_comparison(question: &str) -> Option<Intent> {
    let caps = NUMERIC_COMPARISON.captures(question)?;
    let threshold: f64 = caps[2].replace(',', ".").parse().ok()?;
    let op = match &caps[1] {
        "mayor" | "más" | "mas" | "superior" => Comparison::GreaterThan,
        _ => Comparison::LessThan,
    };
    Some(Intent::NumericComparison { op, threshold })
}

fn extremal(question: &str) -> Option<Intent> {
    if !EXTREMAL.is_match(question) {
        return None;
    }

    let scope = if LENGTH_KEYWORDS.iter().any(|k| question.contains(k)) {
        ExtremalScope::TextLength
    } else {
        ExtremalScope::Numeric
    };
    let max = WORD
        .find_iter(question)
        .any(|w| MAX_KEYWORDS.contains(&w.as_str()));

    Some(Intent::Extremal { max, scope })
}

fn date_range(question: &str) -> Option<Intent> {
    let caps = DATE_RANGE.captures(question)?;
    let date = parse_iso_date(&caps[2])?;
    Some(Intent::DateRange {
        before: &caps[1] == "antes",
        date,
    })
}

fn categorical_count(question: &str) -> Option<Intent> {
    COUNT_KEYWORDS
        .iter()
        .any(|k| question.contains(k))
        .then_some(Intent::CategoricalCount)
}

fn substring_search(question: &str) -> Option<Intent> {
    (!question.is_empty()).then(|| Intent::SubstringSearch {
        needle: question.to_string(),
    })
}

const DEFAULT_MATCHERS: &[Matcher] = &[
    Matcher { name: "numeric_comparison", build: numeric_comparison },
    Matcher { name: "extremal", build: extremal },
    Matcher { name: "date_range", build: date_range },
    Matcher { name: "categorical_count", build: categorical_count },
    Matcher { name: "substring_search", build: substring_search },
];

/// Ordered, first-match-wins question classifier
#[derive(Clone)]
pub struct IntentClassifier {
    matchers: Vec<Matcher>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self {
            matchers: DEFAULT_MATCHERS.to_vec(),
        }
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher names in priority order
    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.name).collect()
    }

    pub fn classify(&self, question: &str) -> Intent {
        let normalized = question.trim().to_lowercase();

        for matcher in &self.matchers {
            if let Some(intent) = (matcher.build)(&normalized) {
                debug!(matcher = matcher.name, question = %normalized, "Intent matched");
                return intent;
            }
        }

        Intent::SemanticFallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(q: &str) -> Intent {
        IntentClassifier::new().classify(q)
    }

    fn date(s: &str) -> NaiveDateTime {
        parse_iso_date(s).unwrap()
    }

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(
            classify("productos con precio mayor a 15"),
            Intent::NumericComparison { op: Comparison::GreaterThan, threshold: 15.0 }
        );
        assert_eq!(
            classify("Peso MENOR de 2,5"),
            Intent::NumericComparison { op: Comparison::LessThan, threshold: 2.5 }
        );
        assert_eq!(
            classify("calorías inferior 100"),
            Intent::NumericComparison { op: Comparison::LessThan, threshold: 100.0 }
        );
        assert_eq!(
            classify("cuesta mas que 3.75"),
            Intent::NumericComparison { op: Comparison::GreaterThan, threshold: 3.75 }
        );
    }

    #[test]
    fn test_numeric_comparison_wins_over_extremal() {
        assert!(matches!(
            classify("cuál es el producto con precio mayor a 10"),
            Intent::NumericComparison { .. }
        ));
    }

    #[test]
    fn test_extremal_numeric() {
        assert_eq!(
            classify("¿Cuál es el producto más caro?"),
            Intent::Extremal { max: true, scope: ExtremalScope::Numeric }
        );
        assert_eq!(
            classify("qué fruta tiene menor peso"),
            Intent::Extremal { max: false, scope: ExtremalScope::Numeric }
        );
    }

    #[test]
    fn test_extremal_text_length() {
        assert_eq!(
            classify("cuál es la descripción más larga"),
            Intent::Extremal { max: true, scope: ExtremalScope::TextLength }
        );
        assert_eq!(
            classify("cuál es el nombre más largo"),
            Intent::Extremal { max: true, scope: ExtremalScope::TextLength }
        );
        assert_eq!(
            classify("qué texto tiene mayor longitud"),
            Intent::Extremal { max: true, scope: ExtremalScope::TextLength }
        );
    }

    #[test]
    fn test_date_range() {
        assert_eq!(
            classify("registros antes de 2021-01-01"),
            Intent::DateRange { before: true, date: date("2021-01-01") }
        );
        assert_eq!(
            classify("ventas despues de 2020-06-15"),
            Intent::DateRange { before: false, date: date("2020-06-15") }
        );
        assert_eq!(
            classify("Pedidos DESPUÉS DE 2019-12-31"),
            Intent::DateRange { before: false, date: date("2019-12-31") }
        );
    }

    #[test]
    fn test_impossible_date_declines() {
        assert_eq!(
            classify("antes de 2021-02-30"),
            Intent::SubstringSearch { needle: "antes de 2021-02-30".into() }
        );
    }

    #[test]
    fn test_categorical_count() {
        assert_eq!(classify("qué tipos de nombre hay"), Intent::CategoricalCount);
        assert_eq!(classify("Cuántos productos hay por categoría"), Intent::CategoricalCount);
        assert_eq!(classify("dame la lista de marcas"), Intent::CategoricalCount);
    }

    #[test]
    fn test_substring_and_fallback() {
        assert_eq!(
            classify("  Leche Entera "),
            Intent::SubstringSearch { needle: "leche entera".into() }
        );
        assert_eq!(classify(""), Intent::SemanticFallback);
        assert_eq!(classify("   "), Intent::SemanticFallback);
    }

    #[test]
    fn test_matcher_order() {
        assert_eq!(
            IntentClassifier::new().matcher_names(),
            vec![
                "numeric_comparison",
                "extremal",
                "date_range",
                "categorical_count",
                "substring_search"
            ]
        );
    }

    #[test]
    fn test_intent_serialization() {
        let json = serde_json::to_value(Intent::NumericComparison {
            op: Comparison::GreaterThan,
            threshold: 15.0,
        })
        .unwrap();
        assert_eq!(json["type"], "numeric_comparison");
        assert_eq!(json["op"], ">");
    }
}
