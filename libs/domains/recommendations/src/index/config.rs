use core_config::{env_optional, env_or_default, env_parse_or};

use crate::error::{RecommendationError, RecommendationResult};

pub const DEFAULT_COLLECTION: &str = "books";

/// Qdrant connection configuration
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub collection: String,
}

impl QdrantConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            api_key: None,
            timeout_secs: 30,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_collection(mut self, collection: String) -> Self {
        self.collection = collection;
        self
    }

    /// `None` when `QDRANT_URL` is unset, meaning the local index is used.
    pub fn from_env() -> RecommendationResult<Option<Self>> {
        let Some(url) = env_optional("QDRANT_URL") else {
            return Ok(None);
        };

        let timeout_secs = env_parse_or("QDRANT_TIMEOUT_SECS", 30u64)
            .map_err(|e| RecommendationError::Config(e.to_string()))?;

        Ok(Some(Self {
            url,
            api_key: env_optional("QDRANT_API_KEY"),
            timeout_secs,
            collection: env_or_default("QDRANT_COLLECTION", DEFAULT_COLLECTION),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_without_url_is_none() {
        temp_env::with_var_unset("QDRANT_URL", || {
            assert!(QdrantConfig::from_env().unwrap().is_none());
        });
    }

    #[test]
    fn test_from_env_with_values() {
        temp_env::with_vars(
            [
                ("QDRANT_URL", Some("http://qdrant:6334")),
                ("QDRANT_API_KEY", Some("secret")),
                ("QDRANT_TIMEOUT_SECS", Some("5")),
                ("QDRANT_COLLECTION", None),
            ],
            || {
                let config = QdrantConfig::from_env().unwrap().unwrap();
                assert_eq!(config.url, "http://qdrant:6334");
                assert_eq!(config.api_key.as_deref(), Some("secret"));
                assert_eq!(config.timeout_secs, 5);
                assert_eq!(config.collection, DEFAULT_COLLECTION);
            },
        );
    }

    #[test]
    fn test_invalid_timeout_is_a_config_error() {
        temp_env::with_vars(
            [
                ("QDRANT_URL", Some("http://qdrant:6334")),
                ("QDRANT_TIMEOUT_SECS", Some("soon")),
            ],
            || {
                let err = QdrantConfig::from_env().unwrap_err();
                assert!(matches!(err, RecommendationError::Config(_)));
            },
        );
    }
}
