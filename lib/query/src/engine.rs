//! Question answering pipeline
//!
//! `ask` runs one question end to end: encode, classify, rank columns,
//! execute the intent, and fall back to the nearest row when the intent
//! produced nothing. Only embedding failures surface as errors.

use crate::executor::{QueryExecutor, DEFAULT_TOP_N};
use crate::intent::{Intent, IntentClassifier};
use crate::result::{Payload, Provenance, QueryResult};
use csvsense_core::{Error, Result, Table, TableId, Vector};
use csvsense_schema::InferenceConfig;
use csvsense_similarity::{
    check_dimensions, rank_columns, EmbeddingCache, EmbeddingProvider, FallbackOutcome,
    RankedColumn, SemanticMatcher, TableEmbeddings, DEFAULT_SIMILARITY_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

/// Engine tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Minimum cosine similarity for a fallback answer
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Value counts returned for categorical questions
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default)]
    pub inference: InferenceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            top_n: DEFAULT_TOP_N,
            inference: InferenceConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::InvalidConfig(format!(
                "similarity_threshold must be within [-1, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.top_n == 0 {
            return Err(Error::InvalidConfig("top_n must be at least 1".to_string()));
        }
        self.inference.validate()
    }
}

/// The answer to one question, with the context needed to explain it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub question: String,
    /// Intent picked by the classifier, before any fallback
    pub intent: Intent,
    pub ranked_columns: Vec<RankedColumn>,
    pub result: QueryResult,
}

pub struct QaEngine {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<EmbeddingCache>,
    config: EngineConfig,
    classifier: IntentClassifier,
    executor: QueryExecutor,
    matcher: SemanticMatcher,
}

impl QaEngine {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: EngineConfig) -> Result<Self> {
        Self::with_cache(provider, Arc::new(EmbeddingCache::new()), config)
    }

    /// Build an engine that shares an embedding cache with other owners
    pub fn with_cache(
        provider: Arc<dyn EmbeddingProvider>,
        cache: Arc<EmbeddingCache>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            matcher: SemanticMatcher::new(config.similarity_threshold)?,
            executor: QueryExecutor::new(config.top_n),
            classifier: IntentClassifier::new(),
            provider,
            cache,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    /// Compute (or fetch) the column and row embeddings of a table
    pub fn prepare(&self, table: &Table) -> Result<Arc<TableEmbeddings>> {
        self.cache.get_or_compute(table, self.provider.as_ref())
    }

    /// Discard cached embeddings of a replaced table
    pub fn forget(&self, table: TableId) -> bool {
        self.cache.invalidate(table)
    }

    fn encode_question(&self, question: &str) -> Result<Vector> {
        let vector = self.provider.encode_one(question)?;
        check_dimensions(self.provider.dimension(), std::slice::from_ref(&vector))?;
        Ok(vector)
    }

    /// Columns ordered by relevance to the question
    pub fn rank_columns(&self, table: &Table, question: &str) -> Result<Vec<RankedColumn>> {
        let embeddings = self.prepare(table)?;
        let query = self.encode_question(question)?;
        Ok(rank_columns(&query, &embeddings.columns, table))
    }

    pub fn ask(&self, table: &Table, question: &str) -> Result<Answer> {
        let embeddings = self.prepare(table)?;
        let query = self.encode_question(question)?;

        let intent = self.classifier.classify(question);
        let ranked_columns = rank_columns(&query, &embeddings.columns, table);

        if !intent.is_fallback() {
            if let Some(execution) = self.executor.execute(&intent, &ranked_columns, table) {
                let column = table.column(execution.column).map(|c| c.name().to_string());
                return Ok(Answer {
                    question: question.to_string(),
                    result: QueryResult::Match {
                        payload: execution.payload,
                        provenance: Provenance {
                            intent: intent.clone(),
                            column,
                            similarity: None,
                        },
                    },
                    intent,
                    ranked_columns,
                });
            }
            debug!(intent = intent.name(), "Intent produced no result, using semantic fallback");
        }

        let result = match self.matcher.match_rows(&query, &embeddings.rows) {
            FallbackOutcome::Matched { row, score } => {
                debug!(row, score, "Semantic fallback matched");
                QueryResult::Match {
                    payload: Payload::Rows(vec![row]),
                    provenance: Provenance {
                        intent: Intent::SemanticFallback,
                        column: None,
                        similarity: Some(score),
                    },
                }
            }
            FallbackOutcome::LowConfidence { best_score } => {
                debug!(?best_score, threshold = self.matcher.threshold(), "No relevant row");
                QueryResult::NoMatch {
                    reason: "no relevant information found".to_string(),
                    best_score,
                }
            }
        };

        Ok(Answer {
            question: question.to_string(),
            intent,
            ranked_columns,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Comparison;
    use csvsense_schema::TableLoader;
    use csvsense_similarity::HashingEmbedder;

    fn engine() -> QaEngine {
        QaEngine::new(Arc::new(HashingEmbedder::default()), EngineConfig::default()).unwrap()
    }

    fn load(csv: &str) -> Table {
        TableLoader::default().load_bytes(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_rule_answer_carries_provenance() {
        let table = load("nombre,precio\npan,10\nleche,20\nqueso,30\n");
        let answer = engine().ask(&table, "productos con precio mayor a 15").unwrap();

        assert_eq!(
            answer.intent,
            Intent::NumericComparison { op: Comparison::GreaterThan, threshold: 15.0 }
        );
        assert_eq!(answer.result.rows(), &[1, 2]);
        let provenance = answer.result.provenance().unwrap();
        assert_eq!(provenance.column.as_deref(), Some("precio"));
        assert_eq!(provenance.similarity, None);
    }

    #[test]
    fn test_empty_intent_result_falls_back() {
        let table = load("nombre,precio\npan integral,10\nleche entera,20\n");
        let engine = QaEngine::new(
            Arc::new(HashingEmbedder::default()),
            EngineConfig { similarity_threshold: 0.3, ..Default::default() },
        )
        .unwrap();

        // no substring hit: the words are reordered
        let answer = engine.ask(&table, "entera leche").unwrap();
        assert!(matches!(answer.intent, Intent::SubstringSearch { .. }));

        let provenance = answer.result.provenance().unwrap();
        assert_eq!(provenance.intent, Intent::SemanticFallback);
        assert!(provenance.similarity.unwrap() >= 0.3);
        assert_eq!(answer.result.rows(), &[1]);
    }

    #[test]
    fn test_unrelated_question_is_no_match() {
        let table = load("nombre,precio\npan,10\nleche,20\n");
        let answer = engine().ask(&table, "xyzzy quux").unwrap();

        assert!(!answer.result.is_match());
        assert!(answer.result.rows().is_empty());
    }

    #[test]
    fn test_same_question_same_answer() {
        let table = load("nombre,categoria\npan,a\nleche,b\nqueso,a\nmiel,b\nsal,a\n");
        let engine = engine();

        let first = engine.ask(&table, "qué tipos de categoria hay").unwrap();
        let second = engine.ask(&table, "qué tipos de categoria hay").unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.cache().len(), 1);
    }

    #[test]
    fn test_forget_drops_embeddings() {
        let table = load("a\n1\n");
        let engine = engine();
        engine.prepare(&table).unwrap();
        assert!(engine.forget(table.id()));
        assert!(engine.cache().is_empty());
    }

    #[test]
    fn test_config_validation() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(8));
        let bad_threshold = EngineConfig { similarity_threshold: 2.0, ..Default::default() };
        assert!(QaEngine::new(provider.clone(), bad_threshold).is_err());

        let bad_top_n = EngineConfig { top_n: 0, ..Default::default() };
        assert!(matches!(bad_top_n.validate(), Err(Error::InvalidConfig(_))));

        let parsed: EngineConfig = serde_json::from_str(r#"{"top_n": 3}"#).unwrap();
        assert_eq!(parsed.top_n, 3);
        assert_eq!(parsed.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
    }
}
