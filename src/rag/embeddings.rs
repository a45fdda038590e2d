//! Embedding providers.
//!
//! [`Embedder`] is the similarity capability used by the context compressor
//! and the local store. Providers are chosen from [`EmbeddingConfig`] by
//! [`create_embedder`].

use crate::types::{AppError, Result};
use crate::utils::toml_config::EmbeddingConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Turns text into dense vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed every text, returning one vector per input in the same order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier, used as part of cache keys
    fn model_name(&self) -> &str;
}

/// Resolve the configured embedding provider
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config {
        #[cfg(feature = "ollama")]
        EmbeddingConfig::Ollama { base_url, model } => {
            Ok(Arc::new(OllamaEmbedder::new(base_url, model.clone())))
        }

        #[cfg(feature = "local-embeddings")]
        EmbeddingConfig::FastEmbed { model } => Ok(Arc::new(FastEmbedder::new(model)?)),

        #[allow(unreachable_patterns)]
        other => Err(AppError::Config(format!(
            "Embedding provider {:?} is not compiled in; enable the matching cargo feature",
            other
        ))),
    }
}

// ============= Ollama =============

#[cfg(feature = "ollama")]
pub struct OllamaEmbedder {
    client: ollama_rs::Ollama,
    model: String,
}

#[cfg(feature = "ollama")]
impl OllamaEmbedder {
    pub fn new(base_url: &str, model: String) -> Self {
        let (host, port) = crate::llm::ollama::parse_host_port(base_url);
        Self {
            client: ollama_rs::Ollama::new(host, port),
            model,
        }
    }
}

#[cfg(feature = "ollama")]
#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use ollama_rs::generation::embeddings::request::{
            EmbeddingsInput, GenerateEmbeddingsRequest,
        };

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request =
            GenerateEmbeddingsRequest::new(self.model.clone(), EmbeddingsInput::Multiple(texts.to_vec()));
        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama embedding error: {}", e)))?;

        if response.embeddings.len() != texts.len() {
            return Err(AppError::LLM(format!(
                "Ollama returned {} embeddings for {} inputs",
                response.embeddings.len(),
                texts.len()
            )));
        }
        Ok(response.embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============= FastEmbed =============

#[cfg(feature = "local-embeddings")]
pub struct FastEmbedder {
    model: Arc<parking_lot::Mutex<fastembed::TextEmbedding>>,
    name: String,
}

#[cfg(feature = "local-embeddings")]
impl FastEmbedder {
    pub fn new(model_name: &str) -> Result<Self> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        let model = match model_name {
            "BAAI/bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "BAAI/bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            "sentence-transformers/all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
            other => {
                return Err(AppError::Config(format!(
                    "Unsupported fastembed model: {}",
                    other
                )))
            }
        };

        let embedding =
            TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(true))
                .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Self {
            model: Arc::new(parking_lot::Mutex::new(embedding)),
            name: model_name.to_string(),
        })
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        // ONNX inference is CPU-bound
        tokio::task::spawn_blocking(move || {
            model
                .lock()
                .embed(texts, None)
                .map_err(|e| AppError::Internal(e.to_string()))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Embedding task failed: {}", e)))?
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
