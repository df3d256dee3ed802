use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommendationError {
    /// Rejected request parameters; the message is shown to the client verbatim
    #[error("{0}")]
    Validation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type RecommendationResult<T> = Result<T, RecommendationError>;

impl From<qdrant_client::QdrantError> for RecommendationError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        RecommendationError::Index(err.to_string())
    }
}

impl From<reqwest::Error> for RecommendationError {
    fn from(err: reqwest::Error) -> Self {
        RecommendationError::Embedding(err.to_string())
    }
}

impl From<serde_json::Error> for RecommendationError {
    fn from(err: serde_json::Error) -> Self {
        RecommendationError::Internal(format!("JSON error: {}", err))
    }
}

impl From<handlebars::RenderError> for RecommendationError {
    fn from(err: handlebars::RenderError) -> Self {
        RecommendationError::Template(err.to_string())
    }
}

impl From<tokio::task::JoinError> for RecommendationError {
    fn from(err: tokio::task::JoinError) -> Self {
        RecommendationError::Internal(format!("Blocking task failed: {}", err))
    }
}

/// Convert RecommendationError to AppError for standardized HTTP error responses
impl From<RecommendationError> for AppError {
    fn from(err: RecommendationError) -> Self {
        match err {
            RecommendationError::Validation(msg) => AppError::BadRequest(msg),
            RecommendationError::Embedding(msg) => {
                AppError::InternalServerError(format!("Embedding error: {}", msg))
            }
            RecommendationError::Index(msg) => {
                AppError::InternalServerError(format!("Index error: {}", msg))
            }
            RecommendationError::Template(msg) => {
                AppError::InternalServerError(format!("Template error: {}", msg))
            }
            RecommendationError::Config(msg) => {
                AppError::InternalServerError(format!("Config error: {}", msg))
            }
            RecommendationError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for RecommendationError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response =
            RecommendationError::Validation("Query cannot be empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_collaborator_failures_map_to_internal_error() {
        let response = RecommendationError::Index("corrupt".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_validation_display_is_the_bare_message() {
        let err = RecommendationError::Validation("nope".to_string());
        assert_eq!(err.to_string(), "nope");
    }
}
