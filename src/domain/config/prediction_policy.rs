//! Prediction Policy Domain Value Object
//!
//! Groups the serving-time policy knobs: request sanity limits, the batch
//! size cap and the width of the confidence band.
//!
//! # Invariants
//!
//! - `confidence_relative_width` lies in `[0.0, 1.0)` so the lower bound stays positive
//! - `max_batch_size` > 0
//! - every validation limit is positive and `min_year_built` is not in the future

use thiserror::Error;

/// Error type for PredictionPolicy validation
#[derive(Debug, Error, PartialEq)]
pub enum PredictionPolicyError {
    #[error("Invalid relative width: {value}. Must be in [0.0, 1.0)")]
    InvalidRelativeWidth { value: f64 },

    #[error("Invalid limit: {field} = {value}. Must be positive")]
    InvalidLimit { field: String, value: f64 },
}

/// Domain constraints enforced on every inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationLimits {
    /// Sanity ceiling on square footage
    pub max_sqft: f64,
    pub max_bedrooms: u32,
    pub max_bathrooms: f64,
    /// Earliest plausible construction year
    pub min_year_built: i32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_sqft: 1_000_000.0,
            max_bedrooms: 20,
            max_bathrooms: 20.0,
            min_year_built: 1800,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionPolicy {
    /// Half-width of the confidence band as a fraction of the estimate (0.10 = ±10%)
    pub confidence_relative_width: f64,

    /// Largest accepted batch; larger batches are rejected before any work
    pub max_batch_size: usize,

    pub limits: ValidationLimits,
}

impl PredictionPolicy {
    /// Create a new PredictionPolicy with validation
    ///
    /// # Errors
    ///
    /// Returns `PredictionPolicyError` if any parameter violates invariants
    pub fn new(
        confidence_relative_width: f64,
        max_batch_size: usize,
        limits: ValidationLimits,
    ) -> Result<Self, PredictionPolicyError> {
        let policy = Self {
            confidence_relative_width,
            max_batch_size,
            limits,
        };

        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> Result<(), PredictionPolicyError> {
        let width = self.confidence_relative_width;
        if !width.is_finite() || !(0.0..1.0).contains(&width) {
            return Err(PredictionPolicyError::InvalidRelativeWidth { value: width });
        }

        if self.max_batch_size == 0 {
            return Err(PredictionPolicyError::InvalidLimit {
                field: "max_batch_size".to_string(),
                value: 0.0,
            });
        }

        Self::validate_positive("max_sqft", self.limits.max_sqft)?;
        Self::validate_positive("max_bedrooms", self.limits.max_bedrooms as f64)?;
        Self::validate_positive("max_bathrooms", self.limits.max_bathrooms)?;
        Self::validate_positive("min_year_built", self.limits.min_year_built as f64)?;

        Ok(())
    }

    fn validate_positive(field: &str, value: f64) -> Result<(), PredictionPolicyError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(PredictionPolicyError::InvalidLimit {
                field: field.to_string(),
                value,
            });
        }
        Ok(())
    }
}

impl Default for PredictionPolicy {
    fn default() -> Self {
        Self {
            confidence_relative_width: 0.10,
            max_batch_size: 100,
            limits: ValidationLimits::default(),
        }
    }
}
