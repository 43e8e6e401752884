use crate::domain::errors::PredictionError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// `PredictionError` rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub PredictionError);

impl From<PredictionError> for ApiError {
    fn from(error: PredictionError) -> Self {
        Self(error)
    }
}

pub fn status_for(error: &PredictionError) -> StatusCode {
    match error {
        PredictionError::Validation(_)
        | PredictionError::Malformed { .. }
        | PredictionError::BatchTooLarge { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PredictionError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        PredictionError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{"error": kind, "message": text, ...details}`
pub fn error_body(error: &PredictionError) -> Value {
    let mut body = json!({
        "error": error.kind(),
        "message": error.to_string(),
        "stage": error.terminal_stage(),
    });
    match error {
        PredictionError::Validation(v) => {
            body["violations"] = json!(v.violations);
        }
        PredictionError::BatchTooLarge { size, max } => {
            body["size"] = json!(size);
            body["max_batch_size"] = json!(max);
        }
        _ => {}
    }
    body
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for(&self.0), Json(error_body(&self.0))).into_response()
    }
}
