use axum::Router;
use domain_recommendations::{RecommendationService, Views, handlers};
use tower_http::services::ServeDir;

pub mod health;

/// Creates the page routes and the `/static` asset mount.
///
/// Returns a stateless Router (all sub-routers have state already applied).
pub fn routes(state: &crate::state::AppState) -> eyre::Result<Router> {
    let views = Views::new(state.config.app)?;
    let service = RecommendationService::new(state.retriever.clone());

    Ok(handlers::router(service, views)
        .nest_service("/static", ServeDir::new(&state.config.static_dir)))
}

/// Creates a router with the /ready endpoint backed by the index health check.
pub fn ready_router(state: crate::state::AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Environment, IndexBackend};
    use crate::state::AppState;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use core_config::{app_info, server::ServerConfig};
    use domain_recommendations::models::Document;
    use domain_recommendations::{
        EmbeddingSettings, RecommendationError, RecommendationResult, Retriever,
    };
    use http_body_util::BodyExt;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct StubRetriever {
        healthy: bool,
    }

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn embed_and_search(
            &self,
            _query: &str,
            k: usize,
        ) -> RecommendationResult<Vec<Document>> {
            Ok((0..k)
                .map(|i| Document::new(format!("book {}", i)).with_metadata("title", "Stub"))
                .collect())
        }

        async fn health_check(&self) -> RecommendationResult<()> {
            if self.healthy {
                Ok(())
            } else {
                Err(RecommendationError::Index("missing".to_string()))
            }
        }
    }

    fn state(healthy: bool) -> AppState {
        AppState {
            config: Config {
                app: app_info!(),
                server: ServerConfig::default(),
                environment: Environment::Development,
                embedding: EmbeddingSettings::default(),
                index: IndexBackend::Local(PathBuf::from("unused")),
                static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
            },
            retriever: Arc::new(StubRetriever { healthy }),
        }
    }

    fn app(state: AppState) -> Router {
        let routes = routes(&state).unwrap().merge(ready_router(state));
        axum_helpers::create_router(routes)
    }

    #[tokio::test]
    async fn test_static_assets_are_served() {
        let request = Request::builder()
            .uri("/static/style.css")
            .body(Body::empty())
            .unwrap();
        let response = app(state(true)).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert_eq!(content_type, "text/css");
    }

    #[tokio::test]
    async fn test_ready_reports_index_state() {
        let request = || Request::builder().uri("/ready").body(Body::empty()).unwrap();

        let response = app(state(true)).oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(state(false)).oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["index"], "disconnected");
    }

    #[tokio::test]
    async fn test_pages_are_wired() {
        let request = Request::builder()
            .method("POST")
            .uri("/recommendations")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("query=sea+stories&k=2"))
            .unwrap();
        let response = app(state(true)).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("book 1"));
        assert!(!html.contains("book 2"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let response = app(state(true)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
