//! House price prediction API server
//!
//! Loads the trained model pipeline once at startup and serves predictions
//! over HTTP. A missing or unreadable model does not stop the server: it
//! starts degraded and `/health` reports `model_loaded: false`.
//!
//! # Usage
//! ```sh
//! MODEL_DIR=models/trained API_PORT=8000 cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `API_HOST`, `API_PORT` - Bind address (default: 0.0.0.0:8000)
//! - `MODEL_DIR`, `MODEL_FILE`, `FEATURE_NAMES_FILE` - Model artifacts
//! - `CONFIDENCE_RELATIVE_WIDTH` - Confidence band half-width (default: 0.10)
//! - `MAX_BATCH_SIZE` - Largest accepted batch (default: 100)
//! - `METRICS_ENABLED` - Serve `GET /metrics` (default: true)

use anyhow::{Context, Result};
use house_price::application::ml::ModelState;
use house_price::application::prediction_service::PredictionService;
use house_price::config::Config;
use house_price::domain::ports::SystemClock;
use house_price::infrastructure::FsArtifactStore;
use house_price::infrastructure::observability::Metrics;
use house_price::interfaces::http::{self, AppState};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("House Price API {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let policy = config.to_prediction_policy()?;
    info!(
        "Configuration loaded: bind={}, model_dir={:?}, max_batch_size={}, band=±{:.0}%",
        config.server.bind_address(),
        config.model.model_dir,
        policy.max_batch_size,
        policy.confidence_relative_width * 100.0
    );

    let store = FsArtifactStore::new(&config.model.model_dir);
    let model = ModelState::load(&store, &config.model.artifact_keys());
    if !model.is_loaded() {
        warn!("Starting without a model; prediction endpoints will return 503");
    }

    let service = Arc::new(PredictionService::new(model, &policy, Arc::new(SystemClock)));
    let metrics = Metrics::new().context("Failed to create metrics registry")?;
    let app = http::router(
        AppState::new(service, metrics),
        config.observability.metrics_enabled,
    );

    let listener = tokio::net::TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address()))?;

    info!("Server running. Press Ctrl+C to shutdown.");
    http::serve(listener, app, async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received. Exiting...");
    })
    .await
}
