use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CollectionExistsRequest, SearchPointsBuilder, Value as QdrantValue, value::Kind,
};
use tracing::instrument;

use super::{QdrantConfig, VectorRepository};
use crate::error::{RecommendationError, RecommendationResult};
use crate::models::{Document, SearchHit, SearchQuery};

/// Payload field holding the document text
pub const CONTENT_FIELD: &str = "page_content";

/// Nested payload object whose scalar fields are also treated as metadata
const METADATA_FIELD: &str = "metadata";

/// Searches a single Qdrant collection of book documents
pub struct QdrantRepository {
    client: Qdrant,
    collection: String,
}

impl QdrantRepository {
    pub fn new(config: QdrantConfig) -> RecommendationResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| RecommendationError::Index(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            collection: config.collection,
        })
    }

    pub fn from_client(client: Qdrant, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }
}

fn scalar_to_string(value: &QdrantValue) -> Option<String> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        Some(Kind::IntegerValue(i)) => Some(i.to_string()),
        Some(Kind::DoubleValue(f)) => Some(f.to_string()),
        Some(Kind::BoolValue(b)) => Some(b.to_string()),
        _ => None,
    }
}

/// Top-level scalars win over same-named fields of the nested metadata object.
fn payload_to_document(mut payload: HashMap<String, QdrantValue>) -> Document {
    let content = payload
        .remove(CONTENT_FIELD)
        .and_then(|v| scalar_to_string(&v))
        .unwrap_or_default();

    let mut metadata = BTreeMap::new();

    if let Some(QdrantValue {
        kind: Some(Kind::StructValue(nested)),
    }) = payload.remove(METADATA_FIELD)
    {
        for (key, value) in &nested.fields {
            if let Some(s) = scalar_to_string(value) {
                metadata.insert(key.clone(), s);
            }
        }
    }

    for (key, value) in &payload {
        if let Some(s) = scalar_to_string(value) {
            metadata.insert(key.clone(), s);
        }
    }

    Document { content, metadata }
}

#[async_trait]
impl VectorRepository for QdrantRepository {
    #[instrument(skip(self, query), fields(collection = %self.collection, limit = query.limit))]
    async fn search(&self, query: SearchQuery) -> RecommendationResult<Vec<SearchHit>> {
        let builder = SearchPointsBuilder::new(&self.collection, query.vector, query.limit as u64)
            .with_payload(true);

        let response = self.client.search_points(builder).await?;

        Ok(response
            .result
            .into_iter()
            .map(|point| SearchHit {
                document: payload_to_document(point.payload),
                score: point.score,
            })
            .collect())
    }

    async fn health_check(&self) -> RecommendationResult<()> {
        let exists = self
            .client
            .collection_exists(CollectionExistsRequest {
                collection_name: self.collection.clone(),
            })
            .await?;

        if exists {
            Ok(())
        } else {
            Err(RecommendationError::Index(format!(
                "Collection '{}' does not exist",
                self.collection
            )))
        }
    }

    fn dimension(&self) -> Option<usize> {
        None
    }
}
