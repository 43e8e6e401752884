// Housing records and inference-time feature derivation
pub mod feature_deriver;
pub mod types;

pub use feature_deriver::FeatureDeriver;
pub use types::{
    Condition, ConfidenceInterval, DerivedFeatureRecord, Location, PredictionRequest,
    PredictionResult, TotalRooms, ValidatedRequest,
};
