//! REST API over the prediction service.
//!
//! - `GET /health`
//! - `POST /predict`
//! - `POST /batch-predict`
//! - `GET /metrics` (when enabled)
//!
//! CORS is permissive so a browser front end on another origin can call the API.

pub mod error;
pub mod handlers;

use crate::application::prediction_service::PredictionService;
use crate::infrastructure::observability::Metrics;
use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>, metrics: Metrics) -> Self {
        metrics.set_model_loaded(service.is_model_loaded());
        Self { service, metrics }
    }
}

pub fn router(state: AppState, metrics_enabled: bool) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .route("/batch-predict", post(handlers::batch_predict));
    if metrics_enabled {
        app = app.route("/metrics", get(handlers::metrics));
    }
    app.layer(CorsLayer::permissive()).with_state(state)
}

/// Serves `app` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("Prediction API listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
