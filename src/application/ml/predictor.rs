use crate::domain::errors::InferenceError;
use crate::domain::ml::{FeatureLayout, FeatureVector};
use std::collections::BTreeMap;

/// Interface for trained regression models
pub trait PricePredictor: Send + Sync {
    /// Column order the model was trained with. Feature vectors must be
    /// encoded with this layout.
    fn layout(&self) -> &FeatureLayout;

    /// Point estimate for a single encoded record
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let mut predictions = self.predict_batch(std::slice::from_ref(features))?;
        predictions.pop().ok_or_else(|| InferenceError::Model {
            reason: "No prediction returned".to_string(),
        })
    }

    /// Point estimates in input order
    fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<f64>, InferenceError>;

    /// Feature name -> relative weight. Empty when the model exposes none.
    fn feature_importances(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }

    /// Get model name/type
    fn name(&self) -> &str;

    /// Get model version/id
    fn version(&self) -> &str;
}
