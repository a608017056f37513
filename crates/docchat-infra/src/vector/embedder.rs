//! FastEmbed-based local embedding generator.
//!
//! Implements [`Embedder`] with fastembed's BGESmallENV15 model (384
//! dimensions) on the ONNX runtime. Inference is CPU-bound, so it runs on
//! the blocking thread pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use docchat_core::retrieval::embedder::Embedder;
use docchat_types::error::RepositoryError;

use super::schema::EMBEDDING_DIMENSION;

const MODEL_NAME: &str = "BAAI/bge-small-en-v1.5";

/// Texts embedded per ONNX run.
const BATCH_SIZE: usize = 32;

pub struct FastEmbedEmbedder {
    // `TextEmbedding::embed` takes `&mut self`.
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedEmbedder {
    /// Load the model, downloading it into `cache_dir` on first use.
    ///
    /// Blocks while the model is fetched and initialised.
    pub fn new(cache_dir: PathBuf, show_download_progress: bool) -> Result<Self, RepositoryError> {
        tracing::debug!(cache_dir = %cache_dir.display(), "loading embedding model");

        let options = InitOptions::new(EmbeddingModel::BGESmallENV15)
            .with_cache_dir(cache_dir)
            .with_show_download_progress(show_download_progress);

        let model = TextEmbedding::try_new(options).map_err(|e| {
            RepositoryError::Embedding(format!("Failed to load {MODEL_NAME}: {e}"))
        })?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

impl Embedder for FastEmbedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| RepositoryError::Embedding("embedding model lock poisoned".into()))?;
            model
                .embed(texts, Some(BATCH_SIZE))
                .map_err(|e| RepositoryError::Embedding(e.to_string()))
        })
        .await
        .map_err(|e| RepositoryError::Embedding(format!("embedding task failed: {e}")))?
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION as usize
    }
}
