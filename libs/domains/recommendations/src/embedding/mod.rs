#[cfg(feature = "local-embeddings")]
mod local;
mod openai;
mod provider;
mod settings;

#[cfg(feature = "local-embeddings")]
pub use local::{LocalConfig, LocalProvider};
pub use openai::{OpenAIConfig, OpenAIProvider};
pub use provider::EmbeddingProvider;
pub use settings::{DEFAULT_MODEL_CACHE_DIR, EmbeddingSettings};

#[cfg(test)]
pub use provider::MockEmbeddingProvider;
