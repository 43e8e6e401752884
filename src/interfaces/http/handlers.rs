use super::error::{ApiError, error_body};
use super::AppState;
use crate::domain::errors::{InferenceError, PredictionError};
use crate::domain::housing::{PredictionRequest, PredictionResult};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use std::time::Instant;
use tokio::task::{JoinError, spawn_blocking};

pub async fn health(State(state): State<AppState>) -> Response {
    let loaded = state.service.is_model_loaded();
    let (status, label) = if loaded {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };
    (status, Json(json!({"status": label, "model_loaded": loaded}))).into_response()
}

pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
    let started = Instant::now();
    let service = state.service.clone();
    let result = spawn_blocking(move || {
        decode_request(&body).and_then(|request| service.predict(&request))
    })
    .await
    .unwrap_or_else(|e| Err(join_failure(e)));

    let outcome = match &result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    state.metrics.inc_requests("predict", outcome);
    state.metrics.inc_predictions(outcome);
    state
        .metrics
        .observe_latency("predict", started.elapsed().as_secs_f64());

    Ok(Json(result?))
}

pub async fn batch_predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<Value>>, ApiError> {
    let started = Instant::now();
    let worker_state = state.clone();
    let result = spawn_blocking(move || run_batch(&worker_state, &body))
        .await
        .unwrap_or_else(|e| Err(join_failure(e)));

    state.metrics.inc_requests(
        "batch_predict",
        match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        },
    );
    state
        .metrics
        .observe_latency("batch_predict", started.elapsed().as_secs_f64());

    Ok(Json(result?))
}

fn run_batch(state: &AppState, body: &[u8]) -> Result<Vec<Value>, PredictionError> {
    let elements: Vec<Value> =
        serde_json::from_slice(body).map_err(|e| PredictionError::Malformed {
            reason: format!("expected a JSON array of requests: {}", e),
        })?;
    state.service.check_batch_size(elements.len())?;
    state.metrics.observe_batch_size(elements.len());

    let items = elements
        .into_iter()
        .map(|element| {
            serde_json::from_value::<PredictionRequest>(element).map_err(|e| {
                PredictionError::Malformed {
                    reason: e.to_string(),
                }
            })
        })
        .collect();

    let results = state.service.predict_batch(items)?;
    Ok(results
        .into_iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(prediction) => {
                state.metrics.inc_predictions("success");
                json!({"index": index, "status": "success", "prediction": prediction})
            }
            Err(e) => {
                state.metrics.inc_predictions(e.kind());
                json!({"index": index, "status": "error", "error": error_body(&e)})
            }
        })
        .collect())
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}

/// Scoring runs on the blocking pool; a panic there surfaces as an inference error.
fn join_failure(error: JoinError) -> PredictionError {
    PredictionError::Inference(InferenceError::Model {
        reason: format!("Scoring task failed: {}", error),
    })
}

fn decode_request(body: &[u8]) -> Result<PredictionRequest, PredictionError> {
    serde_json::from_slice(body).map_err(|e| PredictionError::Malformed {
        reason: e.to_string(),
    })
}
