use async_trait::async_trait;

use crate::error::RecommendationResult;
use crate::models::{EmbeddingModel, EmbeddingProviderType, EmbeddingResult};

/// Trait for embedding generation providers
///
/// A provider is bound to one model at construction; queries and indexed
/// documents must be embedded by the same model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn provider_type(&self) -> EmbeddingProviderType;

    fn model(&self) -> EmbeddingModel;

    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> RecommendationResult<EmbeddingResult>;

    /// Generate embeddings for multiple texts, preserving input order
    async fn embed_batch(&self, texts: &[String]) -> RecommendationResult<Vec<EmbeddingResult>>;
}
