use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{InitOptions, TextEmbedding};
use tracing::{info, instrument};

use super::EmbeddingProvider;
use crate::error::{RecommendationError, RecommendationResult};
use crate::models::{Device, EmbeddingModel, EmbeddingProviderType, EmbeddingResult};

/// Settings for the in-process ONNX embedding model
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub model: EmbeddingModel,
    pub device: Device,
    pub cache_dir: PathBuf,
    pub show_download_progress: bool,
}

impl LocalConfig {
    pub fn new(model: EmbeddingModel, device: Device) -> Self {
        Self {
            model,
            device,
            cache_dir: PathBuf::from(".fastembed_cache"),
            show_download_progress: false,
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_show_download_progress(mut self, show: bool) -> Self {
        self.show_download_progress = show;
        self
    }
}

fn fastembed_model(model: EmbeddingModel) -> RecommendationResult<fastembed::EmbeddingModel> {
    match model {
        EmbeddingModel::AllMiniLmL6V2 => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        EmbeddingModel::BgeSmallEnV15 => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        other => Err(RecommendationError::Config(format!(
            "Model '{}' is not available locally",
            other
        ))),
    }
}

/// Embeddings computed in-process with fastembed
///
/// The model is loaded (and downloaded on first use) when the provider is
/// built, so construction blocks and should happen once at startup.
pub struct LocalProvider {
    model: Arc<Mutex<TextEmbedding>>,
    config: LocalConfig,
    device: Device,
}

impl std::fmt::Debug for LocalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalProvider")
            .field("config", &self.config)
            .field("device", &self.device)
            .finish()
    }
}

impl LocalProvider {
    pub fn new(config: LocalConfig) -> RecommendationResult<Self> {
        let options = InitOptions::new(fastembed_model(config.model)?)
            .with_cache_dir(config.cache_dir.clone())
            .with_show_download_progress(config.show_download_progress);
        let (options, device) = with_device(options, config.device);

        let model = TextEmbedding::try_new(options)
            .map_err(|e| RecommendationError::Embedding(format!("Failed to load model: {}", e)))?;

        info!(model = %config.model, %device, "Local embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            config,
            device,
        })
    }

    /// Device the model actually runs on, which may differ from the request
    pub fn device(&self) -> Device {
        self.device
    }
}

#[cfg(feature = "cuda")]
fn with_device(options: InitOptions, device: Device) -> (InitOptions, Device) {
    match device {
        Device::Cuda => {
            let cuda = ort::execution_providers::CUDAExecutionProvider::default().build();
            (options.with_execution_providers(vec![cuda]), Device::Cuda)
        }
        Device::Cpu => (options, Device::Cpu),
    }
}

#[cfg(not(feature = "cuda"))]
fn with_device(options: InitOptions, device: Device) -> (InitOptions, Device) {
    if device == Device::Cuda {
        tracing::warn!("Built without the `cuda` feature, running the embedding model on cpu");
    }
    (options, Device::Cpu)
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::Local
    }

    fn model(&self) -> EmbeddingModel {
        self.config.model
    }

    async fn embed(&self, text: &str) -> RecommendationResult<EmbeddingResult> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RecommendationError::Embedding("No embedding returned".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.config.model))]
    async fn embed_batch(&self, texts: &[String]) -> RecommendationResult<Vec<EmbeddingResult>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        // ONNX inference is CPU-bound
        let vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| RecommendationError::Internal("Embedding model lock poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| RecommendationError::Embedding(e.to_string()))
        })
        .await??;

        Ok(vectors.into_iter().map(EmbeddingResult::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_models_are_rejected() {
        let err = fastembed_model(EmbeddingModel::TextEmbedding3Small).unwrap_err();
        assert!(err.to_string().contains("text-embedding-3-small"));
    }

    #[test]
    fn test_config_builder() {
        let config = LocalConfig::new(EmbeddingModel::AllMiniLmL6V2, Device::Cpu)
            .with_cache_dir("/tmp/models")
            .with_show_download_progress(true);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/models"));
        assert!(config.show_download_progress);
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_cuda_request_falls_back_to_cpu_without_feature() {
        let options = InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2);
        let (_, device) = with_device(options, Device::Cuda);
        assert_eq!(device, Device::Cpu);
    }
}
