//! Configuration module for the prediction service.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Server, Model artifacts, Prediction policy, and Observability.

mod model_config;
mod observability_config;
mod prediction_config;
mod server_config;

pub use model_config::ModelEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use prediction_config::PredictionEnvConfig;
pub use server_config::ServerEnvConfig;

use crate::domain::config::PredictionPolicy;
use anyhow::{Context, Result};

/// Main application configuration.
///
/// Aggregates the per-concern sub-configs loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerEnvConfig,
    pub model: ModelEnvConfig,
    pub prediction: PredictionEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This orchestrates loading from all sub-config modules and composes
    /// them into a unified Config struct.
    pub fn from_env() -> Result<Self> {
        let server = ServerEnvConfig::from_env().context("Failed to load server config")?;
        let model = ModelEnvConfig::from_env();
        let prediction =
            PredictionEnvConfig::from_env().context("Failed to load prediction config")?;
        let observability = ObservabilityEnvConfig::from_env();

        Ok(Self {
            server,
            model,
            prediction,
            observability,
        })
    }

    /// Create a PredictionPolicy domain value object from this Config
    pub fn to_prediction_policy(&self) -> Result<PredictionPolicy> {
        self.prediction.to_policy()
    }
}
