use async_trait::async_trait;

use crate::error::RecommendationResult;
use crate::models::{SearchHit, SearchQuery};

/// Read-only nearest-neighbour search over stored book documents
///
/// Implementations return at most `query.limit` hits, best first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorRepository: Send + Sync {
    async fn search(&self, query: SearchQuery) -> RecommendationResult<Vec<SearchHit>>;

    /// Ok when the backing store can serve searches
    async fn health_check(&self) -> RecommendationResult<()>;

    /// Vector dimension the store expects, when it is known up front
    fn dimension(&self) -> Option<usize>;
}
