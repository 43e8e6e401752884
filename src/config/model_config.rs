//! Model artifact location, parsed from environment variables.

use crate::domain::repositories::ArtifactKeys;
use std::env;
use std::path::PathBuf;

/// Model artifact environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEnvConfig {
    /// Directory holding the trained artifacts
    pub model_dir: PathBuf,
    pub model_file: String,
    pub feature_names_file: String,
    pub metrics_file: String,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        let keys = ArtifactKeys::default();
        Self {
            model_dir: PathBuf::from("models/trained"),
            model_file: keys.model,
            feature_names_file: keys.feature_names,
            metrics_file: keys.metrics,
        }
    }
}

impl ModelEnvConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model_dir: env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            model_file: env::var("MODEL_FILE").unwrap_or(defaults.model_file),
            feature_names_file: env::var("FEATURE_NAMES_FILE")
                .unwrap_or(defaults.feature_names_file),
            metrics_file: env::var("METRICS_FILE").unwrap_or(defaults.metrics_file),
        }
    }

    pub fn artifact_keys(&self) -> ArtifactKeys {
        ArtifactKeys {
            model: self.model_file.clone(),
            feature_names: self.feature_names_file.clone(),
            metrics: self.metrics_file.clone(),
        }
    }
}
