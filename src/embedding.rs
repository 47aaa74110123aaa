//! Embedding backends.
//!
//! - **[`LocalEmbedder`]** runs a sentence-transformer model in process via
//!   fastembed. The model is downloaded on first use, loaded once, and
//!   shared by every request; no network calls after that.
//! - **[`DisabledEmbedder`]** fails every call with
//!   `EmbeddingUnavailable`; used when `embedding.provider = "disabled"`.
//!
//! Use [`create_embedder`] to build the configured backend.

use std::sync::Arc;

use async_trait::async_trait;
use docchat_core::embedding::Embedder;
use docchat_core::models::Embedding;
use docchat_core::{Error, Result};

use crate::config::EmbeddingConfig;

/// Dimensionality of the supported local models.
pub fn model_dims(model_name: &str) -> Option<usize> {
    match model_name {
        "all-minilm-l6-v2" => Some(384),
        "bge-small-en-v1.5" => Some(384),
        "bge-base-en-v1.5" => Some(768),
        "bge-large-en-v1.5" => Some(1024),
        "nomic-embed-text-v1.5" => Some(768),
        "multilingual-e5-small" => Some(384),
        "multilingual-e5-base" => Some(768),
        _ => None,
    }
}

/// Always-failing embedder.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Embedding>> {
        Err(Error::EmbeddingUnavailable(
            "embedding provider is disabled; set [embedding] provider = \"local\"".to_string(),
        ))
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
pub use local::LocalEmbedder;

#[cfg(feature = "local-embeddings-fastembed")]
mod local {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use docchat_core::embedding::Embedder;
    use docchat_core::models::Embedding;
    use docchat_core::{Error, Result};
    use tracing::info;

    use crate::config::EmbeddingConfig;

    fn to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
        match name {
            "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
            "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
            "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
            "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
            other => Err(Error::EmbeddingUnavailable(format!(
                "unknown local embedding model '{}'",
                other
            ))),
        }
    }

    /// In-process sentence-transformer model.
    ///
    /// fastembed needs `&mut` to run inference, so calls are serialized
    /// through a mutex and executed on the blocking pool.
    pub struct LocalEmbedder {
        model_name: String,
        dims: usize,
        batch_size: usize,
        model: Arc<Mutex<fastembed::TextEmbedding>>,
    }

    impl LocalEmbedder {
        /// Load (downloading if needed) the configured model.
        pub async fn load(config: &EmbeddingConfig) -> Result<Self> {
            let model_name = config.model.clone();
            let fastembed_model = to_fastembed_model(&model_name)?;
            let dims = config
                .dims
                .or_else(|| super::model_dims(&model_name))
                .unwrap_or(384);

            info!(model = %model_name, dims, "loading embedding model");
            let model = tokio::task::spawn_blocking(move || {
                fastembed::TextEmbedding::try_new(
                    fastembed::InitOptions::new(fastembed_model)
                        .with_show_download_progress(false),
                )
            })
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("model loader aborted: {}", e)))?
            .map_err(|e| {
                Error::EmbeddingUnavailable(format!("failed to load '{}': {}", model_name, e))
            })?;

            Ok(Self {
                model_name,
                dims,
                batch_size: config.batch_size,
                model: Arc::new(Mutex::new(model)),
            })
        }
    }

    #[async_trait]
    impl Embedder for LocalEmbedder {
        fn model_name(&self) -> &str {
            &self.model_name
        }

        fn dims(&self) -> usize {
            self.dims
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let model = Arc::clone(&self.model);
            let texts = texts.to_vec();
            let batch_size = self.batch_size;

            tokio::task::spawn_blocking(move || {
                let mut model = model.lock().map_err(|_| {
                    Error::EmbeddingUnavailable("embedding model lock poisoned".to_string())
                })?;
                model
                    .embed(texts, Some(batch_size))
                    .map_err(|e| Error::EmbeddingUnavailable(format!("inference failed: {}", e)))
            })
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("inference aborted: {}", e)))?
        }
    }
}

/// Build the configured embedder. Loading failures are fatal to the caller.
pub async fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalEmbedder::load(config).await?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => Err(Error::EmbeddingUnavailable(
            "local embeddings require --features local-embeddings-fastembed".to_string(),
        )),
        other => Err(Error::EmbeddingUnavailable(format!(
            "unknown embedding provider '{}'",
            other
        ))),
    }
}
