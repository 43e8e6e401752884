//! Repository Pattern Abstractions
//!
//! Storage seams for trained-model artifacts and experiment runs.
//!
//! - `ArtifactStore`: key/blob storage for the model pipeline, its feature
//!   manifest and evaluation metrics
//! - `ExperimentTracker`: sink for the params, metrics and artifacts of a
//!   training run
//!
//! Filesystem and in-memory implementations live in `infrastructure`.

use crate::domain::errors::ModelLoadError;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Blob storage for trained-model artifacts
pub trait ArtifactStore: Send + Sync {
    /// Read the artifact stored under `key`
    fn get(&self, key: &str) -> Result<Vec<u8>, ModelLoadError>;

    /// Store `bytes` under `key`, replacing any previous value
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Artifact keys of one trained model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKeys {
    pub model: String,
    pub feature_names: String,
    pub metrics: String,
}

impl Default for ArtifactKeys {
    fn default() -> Self {
        Self {
            model: "model_pipeline.json".to_string(),
            feature_names: "feature_names.json".to_string(),
            metrics: "metrics.json".to_string(),
        }
    }
}

/// Params, metrics and artifacts recorded for one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRun {
    pub run_id: String,
    pub experiment: String,
    pub started_at: DateTime<Utc>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub artifacts: Vec<String>,
}

impl ExperimentRun {
    pub fn new(experiment: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            experiment: experiment.into(),
            started_at: Utc::now(),
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
        }
    }

    pub fn log_param(&mut self, key: impl Into<String>, value: impl ToString) {
        self.params.insert(key.into(), value.to_string());
    }

    pub fn log_metric(&mut self, key: impl Into<String>, value: f64) {
        self.metrics.insert(key.into(), value);
    }
}

/// Sink for training runs
pub trait ExperimentTracker: Send + Sync {
    /// Persist `run` together with copies of the given artifacts.
    /// Returns where the run was recorded.
    fn record(&self, run: &ExperimentRun, artifacts: &[(&str, &[u8])]) -> Result<PathBuf>;
}
