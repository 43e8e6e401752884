//! Configuration domain module
//!
//! Domain value objects for serving policy, validated on construction.

pub mod prediction_policy;

pub use prediction_policy::{PredictionPolicy, PredictionPolicyError, ValidationLimits};
