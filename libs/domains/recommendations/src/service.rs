use tracing::{info, instrument};

use crate::error::RecommendationResult;
use crate::models::{Query, RecommendationForm, RecommendationItem, ResultCount, ValidatedRequest};
use crate::retriever::Retriever;

/// Validates recommendation requests and turns retrieved documents into items
pub struct RecommendationService<R: Retriever> {
    retriever: R,
}

impl<R: Retriever> RecommendationService<R> {
    pub fn new(retriever: R) -> Self {
        Self { retriever }
    }

    /// Query is checked before k, so a request failing both reports the query.
    pub fn validate(&self, form: &RecommendationForm) -> RecommendationResult<ValidatedRequest> {
        let query = Query::parse(&form.query)?;
        let k = ResultCount::new(form.k)?;
        Ok(ValidatedRequest { query, k })
    }

    /// Items come back in retriever order, at most `k` of them.
    #[instrument(skip(self, request), fields(query = %request.query, k = request.k.get()))]
    pub async fn recommend(
        &self,
        request: &ValidatedRequest,
    ) -> RecommendationResult<Vec<RecommendationItem>> {
        let documents = self
            .retriever
            .embed_and_search(request.query.as_str(), request.k.get())
            .await?;

        let items: Vec<RecommendationItem> = documents
            .into_iter()
            .take(request.k.get())
            .map(RecommendationItem::from)
            .collect();

        info!(results = items.len(), "Recommendations retrieved");
        Ok(items)
    }

    pub async fn health_check(&self) -> RecommendationResult<()> {
        self.retriever.health_check().await
    }
}
