use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::embedding::EmbeddingProvider;
use crate::error::{RecommendationError, RecommendationResult};
use crate::index::VectorRepository;
use crate::models::{Document, SearchQuery};

/// Turns a free-text query into the `k` most similar stored documents
///
/// Results are ordered best first and never longer than `k`. Calls have no
/// side effects, so repeating one is safe.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn embed_and_search(&self, query: &str, k: usize) -> RecommendationResult<Vec<Document>>;

    /// Ok when searches can be served
    async fn health_check(&self) -> RecommendationResult<()>;
}

#[async_trait]
impl<T: Retriever + ?Sized> Retriever for Arc<T> {
    async fn embed_and_search(&self, query: &str, k: usize) -> RecommendationResult<Vec<Document>> {
        (**self).embed_and_search(query, k).await
    }

    async fn health_check(&self) -> RecommendationResult<()> {
        (**self).health_check().await
    }
}

/// Embeds with an [`EmbeddingProvider`] and searches a [`VectorRepository`]
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    repository: Arc<dyn VectorRepository>,
}

impl VectorRetriever {
    /// Fails when the repository's vectors cannot have come from `embedder`.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        repository: Arc<dyn VectorRepository>,
    ) -> RecommendationResult<Self> {
        let expected = embedder.model().dimension();
        if let Some(dimension) = repository.dimension() {
            if dimension != expected {
                return Err(RecommendationError::Config(format!(
                    "Index holds {}-dimensional vectors but model {} produces {}",
                    dimension,
                    embedder.model(),
                    expected
                )));
            }
        }

        Ok(Self {
            embedder,
            repository,
        })
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    #[instrument(skip(self, query))]
    async fn embed_and_search(&self, query: &str, k: usize) -> RecommendationResult<Vec<Document>> {
        let embedding = self.embedder.embed(query).await?;
        debug!(dimension = embedding.dimension, "Query embedded");

        let hits = self
            .repository
            .search(SearchQuery::new(embedding.values, k))
            .await?;

        Ok(hits.into_iter().take(k).map(|hit| hit.document).collect())
    }

    async fn health_check(&self) -> RecommendationResult<()> {
        self.repository.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::index::MockVectorRepository;
    use crate::models::{EmbeddingModel, EmbeddingResult, SearchHit};

    fn hit(content: &str, score: f32) -> SearchHit {
        SearchHit {
            document: Document::new(content),
            score,
        }
    }

    fn embedder() -> MockEmbeddingProvider {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_model()
            .return_const(EmbeddingModel::AllMiniLmL6V2);
        embedder
    }

    #[tokio::test]
    async fn test_embeds_then_searches_with_k() {
        let mut embedder = embedder();
        embedder
            .expect_embed()
            .withf(|text| text == "mystery novel")
            .times(1)
            .returning(|_| Ok(EmbeddingResult::new(vec![0.5; 384])));

        let mut repository = MockVectorRepository::new();
        repository.expect_dimension().return_const(Some(384));
        repository
            .expect_search()
            .withf(|q| q.limit == 2 && q.vector.len() == 384)
            .times(1)
            .returning(|_| Ok(vec![hit("first", 0.9), hit("second", 0.8)]));

        let retriever = VectorRetriever::new(Arc::new(embedder), Arc::new(repository)).unwrap();
        let docs = retriever.embed_and_search("mystery novel", 2).await.unwrap();

        let contents: Vec<_> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_excess_hits_are_cut_to_k() {
        let mut embedder = embedder();
        embedder
            .expect_embed()
            .returning(|_| Ok(EmbeddingResult::new(vec![0.0; 384])));

        let mut repository = MockVectorRepository::new();
        repository.expect_dimension().return_const(None);
        repository
            .expect_search()
            .returning(|_| Ok(vec![hit("a", 0.3), hit("b", 0.2), hit("c", 0.1)]));

        let retriever = VectorRetriever::new(Arc::new(embedder), Arc::new(repository)).unwrap();
        let docs = retriever.embed_and_search("q", 1).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "a");
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_search() {
        let mut embedder = embedder();
        embedder
            .expect_embed()
            .returning(|_| Err(RecommendationError::Embedding("model crashed".to_string())));

        let mut repository = MockVectorRepository::new();
        repository.expect_dimension().return_const(None);
        repository.expect_search().times(0);

        let retriever = VectorRetriever::new(Arc::new(embedder), Arc::new(repository)).unwrap();
        let err = retriever.embed_and_search("q", 3).await.unwrap_err();
        assert!(err.to_string().contains("model crashed"));
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let mut repository = MockVectorRepository::new();
        repository.expect_dimension().return_const(Some(1536));

        let result = VectorRetriever::new(Arc::new(embedder()), Arc::new(repository));
        assert!(matches!(result, Err(RecommendationError::Config(_))));
    }
}
