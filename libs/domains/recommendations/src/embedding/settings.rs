use std::path::PathBuf;
use std::sync::Arc;

use core_config::{env_optional, env_or_default};
use tracing::info;

use super::{EmbeddingProvider, OpenAIConfig, OpenAIProvider};
use crate::error::{RecommendationError, RecommendationResult};
use crate::models::{DeviceSelector, EmbeddingModel, EmbeddingProviderType};

pub const DEFAULT_MODEL_CACHE_DIR: &str = ".fastembed_cache";

/// Which embedding provider to build and how
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderType,
    pub model: EmbeddingModel,
    pub device: DeviceSelector,
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Local,
            model: EmbeddingModel::AllMiniLmL6V2,
            device: DeviceSelector::Auto,
            cache_dir: PathBuf::from(DEFAULT_MODEL_CACHE_DIR),
        }
    }
}

fn default_model(provider: EmbeddingProviderType) -> EmbeddingModel {
    match provider {
        EmbeddingProviderType::Local => EmbeddingModel::AllMiniLmL6V2,
        EmbeddingProviderType::OpenAI => EmbeddingModel::TextEmbedding3Small,
    }
}

impl EmbeddingSettings {
    /// Reads `SHELF_EMBEDDING_PROVIDER`, `SHELF_EMBEDDING_MODEL`, `SHELF_DEVICE`
    /// and `SHELF_MODEL_CACHE_DIR`.
    ///
    /// Without an explicit model the provider's default is used.
    pub fn from_env() -> RecommendationResult<Self> {
        let provider: EmbeddingProviderType =
            env_or_default("SHELF_EMBEDDING_PROVIDER", "local").parse()?;

        let model = match env_optional("SHELF_EMBEDDING_MODEL") {
            Some(name) => name.parse()?,
            None => default_model(provider),
        };

        if model.provider_type() != provider {
            return Err(RecommendationError::Config(format!(
                "Model {} is not served by the {:?} embedding provider",
                model, provider
            )));
        }

        Ok(Self {
            provider,
            model,
            device: env_or_default("SHELF_DEVICE", "auto").parse()?,
            cache_dir: PathBuf::from(env_or_default(
                "SHELF_MODEL_CACHE_DIR",
                DEFAULT_MODEL_CACHE_DIR,
            )),
        })
    }

    /// Resolves the device and constructs the provider.
    ///
    /// Loading a local model blocks until the weights are on disk and in memory.
    pub fn build(&self) -> RecommendationResult<Arc<dyn EmbeddingProvider>> {
        let device = self.device.resolve();
        info!("Using device: {}", device);

        match self.provider {
            EmbeddingProviderType::Local => self.build_local(device),
            EmbeddingProviderType::OpenAI => {
                info!(model = %self.model, "Using OpenAI-compatible embeddings");
                let config = OpenAIConfig::from_env(self.model)?;
                Ok(Arc::new(OpenAIProvider::new(config)))
            }
        }
    }

    #[cfg(feature = "local-embeddings")]
    fn build_local(
        &self,
        device: crate::models::Device,
    ) -> RecommendationResult<Arc<dyn EmbeddingProvider>> {
        use super::{LocalConfig, LocalProvider};

        let config = LocalConfig::new(self.model, device).with_cache_dir(self.cache_dir.clone());
        let provider = LocalProvider::new(config)?;
        if provider.device() != device {
            info!("Using device: {}", provider.device());
        }
        Ok(Arc::new(provider))
    }

    #[cfg(not(feature = "local-embeddings"))]
    fn build_local(
        &self,
        _device: crate::models::Device,
    ) -> RecommendationResult<Arc<dyn EmbeddingProvider>> {
        Err(RecommendationError::Config(
            "Local embeddings require the `local-embeddings` feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 4] = [
        "SHELF_EMBEDDING_PROVIDER",
        "SHELF_EMBEDDING_MODEL",
        "SHELF_DEVICE",
        "SHELF_MODEL_CACHE_DIR",
    ];

    /// Every variable unset except `key`.
    fn only(key: &str, value: &'static str) -> Vec<(&'static str, Option<&'static str>)> {
        VARS.iter()
            .map(|var| (*var, (*var == key).then_some(value)))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let unset: Vec<(&str, Option<&str>)> = VARS.iter().map(|var| (*var, None)).collect();
        temp_env::with_vars(unset, || {
            assert_eq!(EmbeddingSettings::from_env().unwrap(), EmbeddingSettings::default());
        });
    }

    #[test]
    fn test_openai_provider_defaults_to_openai_model() {
        temp_env::with_vars(only("SHELF_EMBEDDING_PROVIDER", "openai"), || {
            let settings = EmbeddingSettings::from_env().unwrap();
            assert_eq!(settings.model, EmbeddingModel::TextEmbedding3Small);
        });
    }

    #[test]
    fn test_mismatched_model_is_rejected() {
        temp_env::with_vars(only("SHELF_EMBEDDING_MODEL", "text-embedding-3-large"), || {
            let err = EmbeddingSettings::from_env().unwrap_err();
            assert!(matches!(err, RecommendationError::Config(_)));
        });
    }

    #[test]
    fn test_invalid_device_is_rejected() {
        temp_env::with_vars(only("SHELF_DEVICE", "tpu"), || {
            assert!(EmbeddingSettings::from_env().is_err());
        });
    }

    #[test]
    fn test_openai_build_requires_api_key() {
        let settings = EmbeddingSettings {
            provider: EmbeddingProviderType::OpenAI,
            model: EmbeddingModel::TextEmbedding3Small,
            device: DeviceSelector::Cpu,
            ..EmbeddingSettings::default()
        };
        temp_env::with_var_unset("OPENAI_API_KEY", || {
            assert!(settings.build().is_err());
        });
    }
}
