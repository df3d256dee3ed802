//! Application state management.
//!
//! The retriever is assembled once at startup and shared by every request.

use std::sync::Arc;

use domain_recommendations::{
    LocalIndexRepository, QdrantRepository, Retriever, VectorRepository, VectorRetriever,
};
use tracing::info;

use crate::config::{Config, IndexBackend};

/// Shared application state.
///
/// Cloning only bumps reference counts.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: Config,
    /// Embeds queries and searches the book index
    pub retriever: Arc<dyn Retriever>,
}

impl AppState {
    /// Loads the embedding model and the index.
    ///
    /// Both loads block, so they run on the blocking pool.
    pub async fn build(config: Config) -> eyre::Result<Self> {
        let embedding = config.embedding.clone();
        let index = config.index.clone();

        let retriever = tokio::task::spawn_blocking(move || -> eyre::Result<VectorRetriever> {
            let embedder = embedding.build()?;
            let repository = build_repository(&index)?;
            Ok(VectorRetriever::new(embedder, repository)?)
        })
        .await??;

        Ok(Self {
            config,
            retriever: Arc::new(retriever),
        })
    }
}

fn build_repository(index: &IndexBackend) -> eyre::Result<Arc<dyn VectorRepository>> {
    match index {
        IndexBackend::Local(path) => Ok(Arc::new(LocalIndexRepository::open(path.clone())?)),
        IndexBackend::Qdrant(qdrant) => {
            info!(url = %qdrant.url, collection = %qdrant.collection, "Using Qdrant index");
            Ok(Arc::new(QdrantRepository::new(qdrant.clone())?))
        }
    }
}
