use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use std::time::Duration;
use tracing::{error, info};

mod api;
mod config;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing with ErrorLayer for span trace capture
    init_tracing(&config.environment);

    // Model and index load once; any failure here is fatal
    let state = AppState::build(config).await.inspect_err(|e| {
        error!("Error initializing embeddings or index: {:#}", e);
    })?;

    // - /health: liveness check with app name/version
    // - /ready: readiness check against the index
    let routes = api::routes(&state)?
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()));

    let app = axum_helpers::create_router(routes);
    let server = state.config.server.clone();

    info!("Starting Shelf web with production-ready shutdown (30s timeout)");

    create_production_app(
        app,
        &server,
        Duration::from_secs(30), // 30s graceful shutdown timeout
        async move {
            // Releases the model and the in-memory index
            drop(state);
            info!("Retriever released");
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Shelf web shutdown complete");
    Ok(())
}
