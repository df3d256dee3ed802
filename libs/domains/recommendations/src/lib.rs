//! Recommendations Domain
//!
//! Book recommendations by semantic similarity: a free-text query is
//! embedded, the nearest books are looked up in a vector index, and the
//! results are rendered as HTML.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTML form and results pages
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Validation, document → item mapping
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Retriever  │  ← Embed the query, search the index
//! └──┬───────┬──┘
//!    │       │
//! ┌──▼───┐ ┌─▼─────┐
//! │Embed │ │ Index │  ← fastembed / OpenAI, local files / Qdrant
//! └──────┘ └───────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_recommendations::{
//!     handlers, LocalConfig, LocalIndexRepository, LocalProvider, RecommendationService,
//!     VectorRetriever, Views,
//! };
//! use domain_recommendations::models::{DeviceSelector, EmbeddingModel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let device = DeviceSelector::Auto.resolve();
//! let embedder = LocalProvider::new(LocalConfig::new(EmbeddingModel::AllMiniLmL6V2, device))?;
//! let index = LocalIndexRepository::open("./chroma_books_data")?;
//! let retriever = VectorRetriever::new(Arc::new(embedder), Arc::new(index))?;
//!
//! let views = Views::new(core_config::app_info!())?;
//! let router = handlers::router(RecommendationService::new(retriever), views);
//! # Ok(())
//! # }
//! ```

pub mod embedding;
pub mod error;
pub mod handlers;
pub mod index;
pub mod models;
pub mod retriever;
pub mod service;
pub mod templates;

// Re-export commonly used types
#[cfg(feature = "local-embeddings")]
pub use embedding::{LocalConfig, LocalProvider};
pub use embedding::{EmbeddingProvider, EmbeddingSettings, OpenAIConfig, OpenAIProvider};
pub use error::{RecommendationError, RecommendationResult};
pub use index::{
    IndexManifest, IndexWriter, LocalIndexRepository, QdrantConfig, QdrantRepository,
    VectorRepository,
};
pub use models::{Document, RecommendationForm, RecommendationItem};
pub use retriever::{Retriever, VectorRetriever};
pub use service::RecommendationService;
pub use templates::Views;
