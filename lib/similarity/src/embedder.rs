//! Embedding providers
//!
//! An [`EmbeddingProvider`] turns column names, row texts and questions into
//! fixed-dimension vectors. Two backends exist:
//!
//! - [`HashingEmbedder`]: deterministic trigram/word feature hashing, no model files
//! - `FastEmbedProvider` (feature `fastembed`): sentence-transformer models run locally
//!
//! [`ModelLoader`] owns the process-wide lifecycle: the backend is built once,
//! on first use, and shared by reference count afterwards.

use crate::distance::hash_text_to_vector;
use csvsense_core::{Error, Result, Vector};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Default dimension for hashed embeddings, matching MiniLM sentence vectors
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Default sentence-transformer model for the fastembed backend
pub const DEFAULT_MODEL: &str = "all-minilm-l6-v2";

/// Batches at least this large are hashed in parallel
const PARALLEL_BATCH_THRESHOLD: usize = 256;

pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the model behind this provider
    fn model_id(&self) -> &str;

    /// Dimension of every vector returned by `encode`
    fn dimension(&self) -> usize;

    /// Encode a batch of texts, one vector per text, in input order
    fn encode(&self, texts: &[String]) -> Result<Vec<Vector>>;

    fn encode_one(&self, text: &str) -> Result<Vector> {
        self.encode(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::Embedding("empty embedding response".to_string()))
    }
}

/// Check that a provider honoured its advertised dimension
pub fn check_dimensions(expected: usize, vectors: &[Vector]) -> Result<()> {
    match vectors.iter().find(|v| v.dim() != expected) {
        Some(v) => Err(Error::InvalidDimension {
            expected,
            actual: v.dim(),
        }),
        None => Ok(()),
    }
}

/// Deterministic embedder based on feature hashing
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dim: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            model_id: format!("hashing-{}", dim),
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let embed = |text: &String| Vector::new(hash_text_to_vector(text, self.dim));
        if texts.len() >= PARALLEL_BATCH_THRESHOLD {
            Ok(texts.par_iter().map(embed).collect())
        } else {
            Ok(texts.iter().map(embed).collect())
        }
    }
}

#[cfg(feature = "fastembed")]
pub use self::local::FastEmbedProvider;

#[cfg(feature = "fastembed")]
mod local {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use parking_lot::Mutex;

    /// Sentence embeddings computed locally with fastembed (ONNX runtime)
    pub struct FastEmbedProvider {
        model: Mutex<TextEmbedding>,
        model_id: String,
        dim: usize,
    }

    fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
        match name.trim().to_lowercase().as_str() {
            "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
            "paraphrase-multilingual-minilm-l12-v2" => {
                Ok((EmbeddingModel::ParaphraseMLMiniLML12V2, 384))
            }
            other => Err(Error::ModelUnavailable(format!("unknown model '{}'", other))),
        }
    }

    impl FastEmbedProvider {
        pub fn try_new(model: &str, cache_dir: Option<PathBuf>) -> Result<Self> {
            let (model_name, dim) = resolve_model(model)?;

            let mut options = InitOptions::new(model_name).with_show_download_progress(false);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }

            let embedder = TextEmbedding::try_new(options)
                .map_err(|e| Error::ModelUnavailable(format!("failed to init '{}': {}", model, e)))?;

            Ok(Self {
                model: Mutex::new(embedder),
                model_id: model.trim().to_lowercase(),
                dim,
            })
        }
    }

    impl EmbeddingProvider for FastEmbedProvider {
        fn model_id(&self) -> &str {
            &self.model_id
        }

        fn dimension(&self) -> usize {
            self.dim
        }

        fn encode(&self, texts: &[String]) -> Result<Vec<Vector>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let embeddings = self
                .model
                .lock()
                .embed(texts.to_vec(), None)
                .map_err(|e| Error::Embedding(format!("failed to embed text: {}", e)))?;
            let vectors: Vec<Vector> = embeddings.into_iter().map(Vector::new).collect();
            if vectors.len() != texts.len() {
                return Err(Error::Embedding(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                )));
            }
            Ok(vectors)
        }
    }
}

fn default_dim() -> usize {
    DEFAULT_EMBEDDING_DIM
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Which embedding backend to build
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbeddingBackend {
    Hashing {
        #[serde(default = "default_dim")]
        dim: usize,
    },
    #[serde(rename = "fastembed")]
    FastEmbed {
        #[serde(default = "default_model")]
        model: String,
        #[serde(default)]
        cache_dir: Option<PathBuf>,
    },
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        EmbeddingBackend::Hashing {
            dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl EmbeddingBackend {
    /// Build a fresh provider. Prefer [`ModelLoader`] to share one instance.
    pub fn build(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        match self {
            EmbeddingBackend::Hashing { dim } => {
                if *dim == 0 {
                    return Err(Error::InvalidConfig(
                        "embedding dimension must be positive".to_string(),
                    ));
                }
                Ok(Arc::new(HashingEmbedder::new(*dim)))
            }
            #[cfg(feature = "fastembed")]
            EmbeddingBackend::FastEmbed { model, cache_dir } => {
                Ok(Arc::new(FastEmbedProvider::try_new(model, cache_dir.clone())?))
            }
            #[cfg(not(feature = "fastembed"))]
            EmbeddingBackend::FastEmbed { model, .. } => Err(Error::ModelUnavailable(format!(
                "model '{}' requires building with the `fastembed` feature",
                model
            ))),
        }
    }
}

/// Lazily initialized, shared embedding model.
///
/// `load` is idempotent: the first successful call builds the provider and
/// every later call returns the same instance. A failed initialization is
/// not cached, so a later call retries.
pub struct ModelLoader {
    backend: EmbeddingBackend,
    provider: OnceCell<Arc<dyn EmbeddingProvider>>,
}

impl ModelLoader {
    pub fn new(backend: EmbeddingBackend) -> Self {
        Self {
            backend,
            provider: OnceCell::new(),
        }
    }

    pub fn backend(&self) -> &EmbeddingBackend {
        &self.backend
    }

    pub fn is_loaded(&self) -> bool {
        self.provider.get().is_some()
    }

    pub fn load(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        self.provider
            .get_or_try_init(|| {
                let provider = self.backend.build().map_err(|e| {
                    warn!(error = %e, "Embedding model failed to initialize");
                    e
                })?;
                info!(
                    model = provider.model_id(),
                    dim = provider.dimension(),
                    "Embedding model loaded"
                );
                Ok(provider)
            })
            .map(Arc::clone)
    }
}
