mod config;
pub mod local;
mod qdrant;
mod repository;

pub use config::{DEFAULT_COLLECTION, QdrantConfig};
pub use local::{IndexManifest, IndexWriter, LocalIndexRepository};
pub use qdrant::{CONTENT_FIELD, QdrantRepository};
pub use repository::VectorRepository;

#[cfg(test)]
pub use repository::MockVectorRepository;
