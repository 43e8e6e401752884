//! Prediction policy configuration parsing from environment variables.
//!
//! Covers the confidence band width, the batch cap and the request
//! validation limits.

use crate::domain::config::{PredictionPolicy, ValidationLimits};
use anyhow::{Context, Result};
use std::env;

/// Prediction environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionEnvConfig {
    pub confidence_relative_width: f64,
    pub max_batch_size: usize,
    pub max_sqft: f64,
    pub max_bedrooms: u32,
    pub max_bathrooms: f64,
    pub min_year_built: i32,
}

impl PredictionEnvConfig {
    pub fn from_env() -> Result<Self> {
        let policy = PredictionPolicy::default();
        Ok(Self {
            confidence_relative_width: Self::parse_f64(
                "CONFIDENCE_RELATIVE_WIDTH",
                policy.confidence_relative_width,
            )?,
            max_batch_size: Self::parse_usize("MAX_BATCH_SIZE", policy.max_batch_size)?,
            max_sqft: Self::parse_f64("MAX_SQFT", policy.limits.max_sqft)?,
            max_bedrooms: Self::parse_u32("MAX_BEDROOMS", policy.limits.max_bedrooms)?,
            max_bathrooms: Self::parse_f64("MAX_BATHROOMS", policy.limits.max_bathrooms)?,
            min_year_built: Self::parse_i32("MIN_YEAR_BUILT", policy.limits.min_year_built)?,
        })
    }

    /// Create a PredictionPolicy domain value object from this config
    pub fn to_policy(&self) -> Result<PredictionPolicy> {
        PredictionPolicy::new(
            self.confidence_relative_width,
            self.max_batch_size,
            ValidationLimits {
                max_sqft: self.max_sqft,
                max_bedrooms: self.max_bedrooms,
                max_bathrooms: self.max_bathrooms,
                min_year_built: self.min_year_built,
            },
        )
        .map_err(|e| anyhow::anyhow!("Invalid prediction config: {}", e))
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_f64(key: &str, default: f64) -> Result<f64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<f64>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_u32(key: &str, default: u32) -> Result<u32> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<u32>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_i32(key: &str, default: i32) -> Result<i32> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<i32>()
            .context(format!("Failed to parse {}", key))
    }
}
