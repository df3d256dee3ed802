use async_trait::async_trait;
use core_config::{env_optional, env_required};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::EmbeddingProvider;
use crate::error::{RecommendationError, RecommendationResult};
use crate::models::{EmbeddingModel, EmbeddingProviderType, EmbeddingResult};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible embeddings endpoint configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: EmbeddingModel,
}

impl OpenAIConfig {
    pub fn new(api_key: String, model: EmbeddingModel) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Reads `OPENAI_API_KEY` (required) and `OPENAI_BASE_URL`.
    pub fn from_env(model: EmbeddingModel) -> RecommendationResult<Self> {
        let api_key = env_required("OPENAI_API_KEY")
            .map_err(|e| RecommendationError::Config(e.to_string()))?;

        let config = Self::new(api_key, model);
        Ok(match env_optional("OPENAI_BASE_URL") {
            Some(url) => config.with_base_url(url),
            None => config,
        })
    }
}

/// Embeddings over HTTP from an OpenAI-compatible server
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.config.base_url)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn provider_type(&self) -> EmbeddingProviderType {
        EmbeddingProviderType::OpenAI
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

        let request = EmbeddingRequest {
            model: self.config.model.model_name(),
            input: texts,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RecommendationError::Embedding(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let embedding_response: EmbeddingResponse = response.json().await?;

        // The API may answer out of order
        let mut data = embedding_response.data;
        data.sort_by_key(|d| d.index);

        if data.len() != texts.len() {
            return Err(RecommendationError::Embedding(format!(
                "Expected {} embeddings, received {}",
                texts.len(),
                data.len()
            )));
        }

        Ok(data
            .into_iter()
            .map(|d| EmbeddingResult::new(d.embedding))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = OpenAIConfig::new("key".to_string(), EmbeddingModel::TextEmbedding3Small)
            .with_base_url("http://localhost:11434/v1/".to_string());
        let provider = OpenAIProvider::new(config);
        assert_eq!(provider.endpoint(), "http://localhost:11434/v1/embeddings");
    }

    #[test]
    fn test_from_env_requires_api_key() {
        temp_env::with_var_unset("OPENAI_API_KEY", || {
            let err = OpenAIConfig::from_env(EmbeddingModel::TextEmbedding3Small).unwrap_err();
            assert!(err.to_string().contains("OPENAI_API_KEY"));
        });
    }

    #[test]
    fn test_from_env_reads_base_url() {
        temp_env::with_vars(
            [
                ("OPENAI_API_KEY", Some("sk-test")),
                ("OPENAI_BASE_URL", Some("http://proxy.local/v1")),
            ],
            || {
                let config = OpenAIConfig::from_env(EmbeddingModel::TextEmbedding3Small).unwrap();
                assert_eq!(config.api_key, "sk-test");
                assert_eq!(config.base_url, "http://proxy.local/v1");
            },
        );
    }

    #[tokio::test]
    async fn test_empty_batch_skips_the_network() {
        let config = OpenAIConfig::new("key".to_string(), EmbeddingModel::TextEmbedding3Small)
            .with_base_url("http://127.0.0.1:9".to_string());
        let provider = OpenAIProvider::new(config);
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
