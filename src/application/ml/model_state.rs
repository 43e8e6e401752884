use super::predictor::PricePredictor;
use super::smartcore_predictor::SmartCorePredictor;
use crate::domain::errors::PredictionError;
use crate::domain::repositories::{ArtifactKeys, ArtifactStore};
use std::sync::Arc;
use tracing::{error, info};

/// Whether a usable model is held by the serving process.
///
/// Fixed at startup. A failed load leaves the process running in the
/// `Unavailable` state so health checks can report it.
#[derive(Clone)]
pub enum ModelState {
    Loaded(Arc<dyn PricePredictor>),
    Unavailable { reason: String },
}

impl ModelState {
    pub fn load(store: &dyn ArtifactStore, keys: &ArtifactKeys) -> Self {
        match SmartCorePredictor::load(store, keys) {
            Ok(predictor) => {
                info!("Model ready: {} {}", predictor.name(), predictor.version());
                ModelState::Loaded(Arc::new(predictor))
            }
            Err(e) => {
                error!("Model unavailable: {}", e);
                ModelState::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Loaded(_))
    }

    pub fn predictor(&self) -> Result<&Arc<dyn PricePredictor>, PredictionError> {
        match self {
            ModelState::Loaded(p) => Ok(p),
            ModelState::Unavailable { reason } => Err(PredictionError::ModelUnavailable {
                reason: reason.clone(),
            }),
        }
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::Loaded(p) => write!(f, "Loaded({} {})", p.name(), p.version()),
            ModelState::Unavailable { reason } => write!(f, "Unavailable({})", reason),
        }
    }
}
