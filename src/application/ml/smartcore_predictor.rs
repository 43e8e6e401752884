use super::pipeline::ModelPipeline;
use super::predictor::PricePredictor;
use crate::domain::errors::{InferenceError, ModelLoadError};
use crate::domain::ml::{FeatureLayout, FeatureVector};
use crate::domain::repositories::{ArtifactKeys, ArtifactStore};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Serves a `ModelPipeline` produced by `train_model`.
pub struct SmartCorePredictor {
    pipeline: ModelPipeline,
    layout: FeatureLayout,
    importances: BTreeMap<String, f64>,
}

impl SmartCorePredictor {
    /// Pairs a decoded pipeline with the feature manifest stored next to it.
    /// The manifest must list exactly the pipeline's columns in the same order.
    pub fn new(pipeline: ModelPipeline, manifest: Vec<String>) -> Result<Self, ModelLoadError> {
        if manifest != pipeline.feature_names {
            return Err(ModelLoadError::ManifestMismatch {
                reason: format!(
                    "manifest lists {:?}, pipeline was trained on {:?}",
                    manifest, pipeline.feature_names
                ),
            });
        }
        let layout = FeatureLayout::from_manifest(&manifest)?;

        if pipeline.scaler.width() != layout.len() {
            return Err(ModelLoadError::ManifestMismatch {
                reason: format!(
                    "scaler has {} columns, manifest has {}",
                    pipeline.scaler.width(),
                    layout.len()
                ),
            });
        }

        let importances = match &pipeline.feature_importances {
            Some(weights) if weights.len() == layout.len() => manifest
                .iter()
                .cloned()
                .zip(weights.iter().copied())
                .collect(),
            Some(weights) => {
                return Err(ModelLoadError::ManifestMismatch {
                    reason: format!(
                        "{} feature importances for {} columns",
                        weights.len(),
                        layout.len()
                    ),
                });
            }
            None => BTreeMap::new(),
        };

        Ok(Self {
            pipeline,
            layout,
            importances,
        })
    }

    /// Reads and decodes the pipeline and manifest from `store`.
    pub fn load(store: &dyn ArtifactStore, keys: &ArtifactKeys) -> Result<Self, ModelLoadError> {
        let model_bytes = store.get(&keys.model)?;
        let pipeline: ModelPipeline =
            serde_json::from_slice(&model_bytes).map_err(|e| ModelLoadError::Decode {
                key: keys.model.clone(),
                reason: e.to_string(),
            })?;

        let manifest_bytes = store.get(&keys.feature_names)?;
        let manifest: Vec<String> =
            serde_json::from_slice(&manifest_bytes).map_err(|e| ModelLoadError::Decode {
                key: keys.feature_names.clone(),
                reason: e.to_string(),
            })?;

        let predictor = Self::new(pipeline, manifest)?;
        if predictor.importances.is_empty() {
            warn!(
                "Model {} exposes no feature importances; responses will carry an empty map",
                predictor.pipeline.name
            );
        }
        info!(
            "Loaded {} model {} ({} features) from {}",
            predictor.pipeline.regressor.kind(),
            predictor.pipeline.version,
            predictor.layout.len(),
            store.describe()
        );
        Ok(predictor)
    }

    pub fn pipeline(&self) -> &ModelPipeline {
        &self.pipeline
    }
}

impl PricePredictor for SmartCorePredictor {
    fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<f64>, InferenceError> {
        let rows: Vec<Vec<f64>> = features.iter().map(|f| f.as_slice().to_vec()).collect();
        self.pipeline.predict_rows(&rows)
    }

    fn feature_importances(&self) -> BTreeMap<String, f64> {
        self.importances.clone()
    }

    fn name(&self) -> &str {
        &self.pipeline.name
    }

    fn version(&self) -> &str {
        &self.pipeline.version
    }
}
