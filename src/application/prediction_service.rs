use crate::application::ml::{ModelState, PricePredictor};
use crate::domain::config::prediction_policy::PredictionPolicy;
use crate::domain::errors::{InferenceError, PredictionError, PredictionStage};
use crate::domain::housing::{FeatureDeriver, PredictionRequest, PredictionResult};
use crate::domain::ml::confidence::round_cents;
use crate::domain::ml::{ConfidenceEstimator, FeatureLayout, FeatureVector};
use crate::domain::ports::Clock;
use crate::domain::validation::RequestValidator;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Orchestrates validation, derivation, encoding, scoring and response
/// shaping for single and batch predictions.
///
/// Holds no mutable state; share it behind an `Arc`.
pub struct PredictionService {
    model: ModelState,
    validator: RequestValidator,
    deriver: FeatureDeriver,
    estimator: ConfidenceEstimator,
    clock: Arc<dyn Clock>,
    max_batch_size: usize,
}

impl PredictionService {
    pub fn new(model: ModelState, policy: &PredictionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            model,
            validator: RequestValidator::new(policy.limits.clone()),
            deriver: FeatureDeriver,
            estimator: ConfidenceEstimator::new(policy.confidence_relative_width),
            clock,
            max_batch_size: policy.max_batch_size,
        }
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.is_loaded()
    }

    pub fn model_state(&self) -> &ModelState {
        &self.model
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Rejects batches above the configured cap.
    pub fn check_batch_size(&self, size: usize) -> Result<(), PredictionError> {
        if size > self.max_batch_size {
            return Err(PredictionError::BatchTooLarge {
                size,
                max: self.max_batch_size,
            });
        }
        Ok(())
    }

    /// Scores one record. Any failure fails the whole call.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictionError> {
        debug!(stage = ?PredictionStage::Received, "predict");
        let result = self.predict_inner(request);
        match &result {
            Ok(r) => debug!(
                stage = ?PredictionStage::Responded,
                "Predicted {:.2}", r.predicted_price
            ),
            Err(e) => debug!(stage = ?e.terminal_stage(), "Prediction failed: {}", e),
        }
        result
    }

    fn predict_inner(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictionError> {
        let predictor = self.model.predictor()?;
        let features = self.encode(request, self.clock.current_year(), predictor.layout())?;

        let estimate = predictor.predict(&features)?;
        debug!(stage = ?PredictionStage::Scored, "Raw estimate {}", estimate);

        self.finalize(estimate, predictor.feature_importances())
    }

    /// Scores a batch with partial-failure semantics.
    ///
    /// The outer `Err` rejects the call as a whole (oversized batch, no
    /// model). Otherwise the output has one entry per input, in input order;
    /// elements that failed to decode arrive here already as `Err`.
    pub fn predict_batch(
        &self,
        items: Vec<Result<PredictionRequest, PredictionError>>,
    ) -> Result<Vec<Result<PredictionResult, PredictionError>>, PredictionError> {
        self.check_batch_size(items.len())?;
        let predictor = self.model.predictor()?;
        let year = self.clock.current_year();

        let mut slots: Vec<Option<Result<PredictionResult, PredictionError>>> =
            (0..items.len()).map(|_| None).collect();
        let mut indices = Vec::with_capacity(items.len());
        let mut vectors = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            match item.and_then(|request| self.encode(&request, year, predictor.layout())) {
                Ok(features) => {
                    indices.push(index);
                    vectors.push(features);
                }
                Err(e) => {
                    debug!(index, stage = ?e.terminal_stage(), "Batch element failed: {}", e);
                    slots[index] = Some(Err(e));
                }
            }
        }

        let estimates = score_isolated(predictor.as_ref(), &vectors);
        let importances = predictor.feature_importances();
        for (index, estimate) in indices.into_iter().zip(estimates) {
            slots[index] = Some(
                estimate
                    .map_err(PredictionError::from)
                    .and_then(|value| self.finalize(value, importances.clone())),
            );
        }

        Ok(slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(PredictionError::Inference(InferenceError::Model {
                        reason: "Element was not scored".to_string(),
                    }))
                })
            })
            .collect())
    }

    fn encode(
        &self,
        request: &PredictionRequest,
        reference_year: i32,
        layout: &FeatureLayout,
    ) -> Result<FeatureVector, PredictionError> {
        let validated = self.validator.validate(request, reference_year)?;
        debug!(stage = ?PredictionStage::Validated, "Request validated");

        let derived = self.deriver.derive(&validated, reference_year);
        debug!(
            stage = ?PredictionStage::Derived,
            "house_age={} bed_bath_ratio={:.3} total_rooms={:?}",
            derived.house_age, derived.bed_bath_ratio, derived.total_rooms
        );

        let features = layout.encode(&derived);
        debug!(stage = ?PredictionStage::Encoded, "{} columns", features.len());
        Ok(features)
    }

    fn finalize(
        &self,
        estimate: f64,
        features_importance: BTreeMap<String, f64>,
    ) -> Result<PredictionResult, PredictionError> {
        let predicted_price = round_cents(estimate);
        if !estimate.is_finite() || predicted_price <= 0.0 {
            return Err(InferenceError::InvalidEstimate { value: estimate }.into());
        }

        Ok(PredictionResult {
            predicted_price,
            confidence_interval: self.estimator.interval(predicted_price),
            features_importance,
            prediction_time: self.clock.now(),
        })
    }
}

/// Scores `vectors` together, falling back to one call per vector when the
/// batched call fails so that one bad row cannot fail its neighbours.
fn score_isolated(
    predictor: &dyn PricePredictor,
    vectors: &[FeatureVector],
) -> Vec<Result<f64, InferenceError>> {
    if vectors.is_empty() {
        return Vec::new();
    }
    match predictor.predict_batch(vectors) {
        Ok(estimates) if estimates.len() == vectors.len() => estimates.into_iter().map(Ok).collect(),
        Ok(estimates) => {
            warn!(
                "Batched scoring returned {} estimates for {} rows; scoring individually",
                estimates.len(),
                vectors.len()
            );
            vectors.iter().map(|v| predictor.predict(v)).collect()
        }
        Err(e) => {
            warn!("Batched scoring failed ({}); scoring individually", e);
            vectors.iter().map(|v| predictor.predict(v)).collect()
        }
    }
}
