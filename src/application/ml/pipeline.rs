//! Serialized model pipeline: standardization followed by a smartcore regressor
//! (random forest or one of the linear family).
//!
//! This is the artifact written by `train_model` and loaded by the serving
//! process. The stored `feature_names` fix the column order of every row
//! passed to `predict_rows`.

use crate::domain::errors::InferenceError;
use crate::domain::ml::FeatureLayout;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::elastic_net::ElasticNet;
use smartcore::linear::lasso::Lasso;
use smartcore::linear::linear_regression::LinearRegression;
use smartcore::linear::ridge_regression::RidgeRegression;

pub type ForestModel = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
pub type LinearModel = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;
pub type RidgeModel = RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;
pub type LassoModel = Lasso<f64, f64, DenseMatrix<f64>, Vec<f64>>;
pub type ElasticNetModel = ElasticNet<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Per-column standardization fitted on the training matrix.
///
/// One-hot columns keep mean 0 and scale 1 so they pass through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>], layout: &FeatureLayout) -> Self {
        let width = layout.len();
        let mut mean = vec![0.0; width];
        let mut scale = vec![1.0; width];
        let n = rows.len() as f64;

        if rows.is_empty() {
            return Self { mean, scale };
        }

        for (j, column) in layout.columns().iter().enumerate() {
            if column.is_categorical() {
                continue;
            }
            let mu = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] - mu).powi(2)).sum::<f64>() / n;
            let sd = var.sqrt();
            mean[j] = mu;
            // Constant columns are centred but not scaled.
            scale[j] = if sd > f64::EPSILON { sd } else { 1.0 };
        }

        Self { mean, scale }
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mu, sd))| (x - mu) / sd)
            .collect()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", content = "model", rename_all = "snake_case")]
pub enum Regressor {
    RandomForest(ForestModel),
    Linear(LinearModel),
    Ridge(RidgeModel),
    Lasso(LassoModel),
    ElasticNet(ElasticNetModel),
}

impl Regressor {
    pub fn kind(&self) -> &'static str {
        match self {
            Regressor::RandomForest(_) => "random_forest",
            Regressor::Linear(_) => "linear",
            Regressor::Ridge(_) => "ridge",
            Regressor::Lasso(_) => "lasso",
            Regressor::ElasticNet(_) => "elastic_net",
        }
    }

    /// Tree ensembles get permutation importances at training time.
    pub fn supports_importances(&self) -> bool {
        matches!(self, Regressor::RandomForest(_))
    }

    pub fn predict(&self, x: &DenseMatrix<f64>) -> Result<Vec<f64>, InferenceError> {
        let result = match self {
            Regressor::RandomForest(m) => m.predict(x),
            Regressor::Linear(m) => m.predict(x),
            Regressor::Ridge(m) => m.predict(x),
            Regressor::Lasso(m) => m.predict(x),
            Regressor::ElasticNet(m) => m.predict(x),
        };
        result.map_err(|e| InferenceError::Model {
            reason: e.to_string(),
        })
    }
}

#[derive(Serialize, Deserialize)]
pub struct ModelPipeline {
    pub name: String,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    /// Training-target mean; the regressor is fit on centered targets.
    #[serde(default)]
    pub target_offset: f64,
    pub regressor: Regressor,
    /// Relative weights aligned with `feature_names`; absent for models without them.
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
}

impl ModelPipeline {
    pub fn width(&self) -> usize {
        self.feature_names.len()
    }

    /// Standardizes and scores raw rows in `feature_names` order.
    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, InferenceError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let expected = self.width();
        if let Some(bad) = rows.iter().find(|r| r.len() != expected) {
            return Err(InferenceError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        let scaled: Vec<Vec<f64>> = rows.iter().map(|r| self.scaler.transform(r)).collect();
        let matrix = DenseMatrix::from_2d_vec(&scaled).map_err(|e| InferenceError::Model {
            reason: format!("Matrix creation failed: {}", e),
        })?;

        let predictions: Vec<f64> = self
            .regressor
            .predict(&matrix)?
            .into_iter()
            .map(|p| p + self.target_offset)
            .collect();
        if predictions.len() != rows.len() {
            return Err(InferenceError::Model {
                reason: format!(
                    "Model returned {} predictions for {} rows",
                    predictions.len(),
                    rows.len()
                ),
            });
        }
        Ok(predictions)
    }
}
