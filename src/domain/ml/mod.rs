pub mod confidence;
pub mod feature_registry;

pub use confidence::ConfidenceEstimator;
pub use feature_registry::{FeatureColumn, FeatureLayout, FeatureVector, NumericFeature};
