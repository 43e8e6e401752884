use serde::Serialize;
use thiserror::Error;

/// Lifecycle stage of a single prediction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStage {
    Received,
    Validated,
    Derived,
    Encoded,
    Scored,
    Responded,
    /// Terminal: the input was rejected before reaching the model.
    Rejected,
    /// Terminal: no model is loaded.
    Unavailable,
}

/// One violated domain constraint on an inbound field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every field of a request that failed validation, not just the first.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Validation failed: {}", summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|v| v.field).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while loading the model pipeline and its feature manifest
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("Artifact not found: {key}")]
    ArtifactMissing { key: String },

    #[error("Failed to read artifact {key}: {reason}")]
    ArtifactUnreadable { key: String, reason: String },

    #[error("Failed to decode artifact {key}: {reason}")]
    Decode { key: String, reason: String },

    #[error("Feature manifest does not match the model pipeline: {reason}")]
    ManifestMismatch { reason: String },

    #[error(transparent)]
    Layout(#[from] FeatureLayoutError),
}

/// Errors raised when building a feature layout from a list of names
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureLayoutError {
    #[error("Unknown feature: {name}")]
    UnknownFeature { name: String },

    #[error("Feature {name} is derived from the target and cannot be used for inference")]
    TargetLeakage { name: String },

    #[error("Duplicate feature: {name}")]
    Duplicate { name: String },

    #[error("Feature list is empty")]
    Empty,
}

/// Errors raised by the model adapter while scoring
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("Feature vector has {actual} columns, model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model inference failed: {reason}")]
    Model { reason: String },

    #[error("Model returned an invalid estimate: {value}")]
    InvalidEstimate { value: f64 },
}

/// Errors surfaced by the prediction service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Malformed request: {reason}")]
    Malformed { reason: String },

    #[error("Model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("Batch size {size} exceeds the maximum of {max} items")]
    BatchTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl PredictionError {
    /// Machine-readable error kind used in API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::Validation(_) => "validation_error",
            PredictionError::Malformed { .. } => "malformed_request",
            PredictionError::ModelUnavailable { .. } => "model_unavailable",
            PredictionError::BatchTooLarge { .. } => "batch_too_large",
            PredictionError::Inference(_) => "inference_error",
        }
    }

    /// Stage at which the call stopped.
    pub fn terminal_stage(&self) -> PredictionStage {
        match self {
            PredictionError::Validation(_)
            | PredictionError::Malformed { .. }
            | PredictionError::BatchTooLarge { .. } => PredictionStage::Rejected,
            PredictionError::ModelUnavailable { .. } => PredictionStage::Unavailable,
            PredictionError::Inference(_) => PredictionStage::Encoded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_field() {
        let error = ValidationError {
            violations: vec![
                FieldViolation::new("sqft", "must be greater than 0"),
                FieldViolation::new("location", "unknown location 'Atlantis'"),
            ],
        };

        let msg = error.to_string();
        assert!(msg.contains("sqft: must be greater than 0"));
        assert!(msg.contains("Atlantis"));
        assert_eq!(error.fields(), vec!["sqft", "location"]);
        assert!(error.has_field("location"));
        assert!(!error.has_field("bedrooms"));
    }

    #[test]
    fn test_batch_too_large_formatting() {
        let error = PredictionError::BatchTooLarge { size: 101, max: 100 };
        let msg = error.to_string();
        assert!(msg.contains("101"));
        assert!(msg.contains("100"));
        assert_eq!(error.kind(), "batch_too_large");
    }

    #[test]
    fn test_terminal_stages() {
        let unavailable = PredictionError::ModelUnavailable {
            reason: "not loaded".to_string(),
        };
        assert_eq!(unavailable.terminal_stage(), PredictionStage::Unavailable);

        let rejected = PredictionError::Validation(ValidationError { violations: vec![] });
        assert_eq!(rejected.terminal_stage(), PredictionStage::Rejected);
    }
}
