//! Cross-validated grid search, refit and artifact export.
//!
//! Rows are encoded with the same `FeatureLayout` the serving process
//! rebuilds from `feature_names.json`, so training and inference see
//! identical columns. Target-derived columns are dropped from the feature
//! selection before the layout is built.

use super::table::{RawTable, parse_number};
use crate::application::ml::pipeline::{ModelPipeline, Regressor, StandardScaler};
use crate::domain::housing::feature_deriver::{bed_bath_ratio, house_age};
use crate::domain::housing::{Condition, DerivedFeatureRecord, Location, TotalRooms};
use crate::domain::ml::feature_registry::{DEFAULT_FEATURES, TARGET_DERIVED_FEATURES};
use crate::domain::ml::FeatureLayout;
use crate::domain::repositories::{ArtifactKeys, ArtifactStore, ExperimentRun, ExperimentTracker};
use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::elastic_net::{ElasticNet, ElasticNetParameters};
use smartcore::linear::lasso::{Lasso, LassoParameters};
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use smartcore::linear::ridge_regression::{RidgeRegression, RidgeRegressionParameters};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Training configuration, read from TOML.
///
/// ```toml
/// cv = 5
/// seed = 42
///
/// [model]
/// name = "house_price_model"
/// best_model = "RandomForest"
/// target_variable = "price"
/// features = ["sqft", "bedrooms", "location"]
///
/// [model.parameters]
/// n_estimators = 200
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default = "default_cv")]
    pub cv: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_experiment")]
    pub experiment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_best_model")]
    pub best_model: String,
    #[serde(default = "default_target")]
    pub target_variable: String,
    /// Raw feature selection; `DEFAULT_FEATURES` when absent.
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub parameters: ModelParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub n_estimators: Option<usize>,
    /// Unbounded when absent.
    pub max_depth: Option<u16>,
    pub min_samples_split: Option<usize>,
    /// Regularization strength for ridge, lasso and elastic net.
    pub alpha: Option<f64>,
    /// Elastic net L1 share in `[0, 1]`.
    pub l1_ratio: Option<f64>,
}

fn default_cv() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

fn default_experiment() -> String {
    "house_price_prediction".to_string()
}

fn default_model_name() -> String {
    "house_price_model".to_string()
}

fn default_best_model() -> String {
    "RandomForest".to_string()
}

fn default_target() -> String {
    "price".to_string()
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            best_model: default_best_model(),
            target_variable: default_target(),
            features: None,
            parameters: ModelParameters::default(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model: ModelSection::default(),
            cv: default_cv(),
            seed: default_seed(),
            experiment: default_experiment(),
        }
    }
}

impl TrainingConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse training config TOML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read training config {:?}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config {:?}", path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    RandomForest,
    Linear,
    Ridge,
    Lasso,
    ElasticNet,
}

/// Regressor names that are recognized but have no smartcore model that can
/// be stored as an artifact.
const UNSUPPORTED_MODELS: &[&str] = &[
    "gradientboosting",
    "gbr",
    "extratrees",
    "svr",
    "xgboost",
    "xgb",
    "lgbm",
    "lightgbm",
    "catboost",
];

impl ModelKind {
    /// Resolves a configured model name. Recognized regressors without a
    /// storable implementation are an error; unknown names fall back to a
    /// random forest.
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized = name.to_lowercase().replace(['_', '-', ' '], "");
        let kind = match normalized.as_str() {
            "randomforest" | "rf" => ModelKind::RandomForest,
            "linear" | "linearregression" => ModelKind::Linear,
            "ridge" => ModelKind::Ridge,
            "lasso" => ModelKind::Lasso,
            "elasticnet" => ModelKind::ElasticNet,
            other if UNSUPPORTED_MODELS.contains(&other) => bail!(
                "Model '{}' is not available; use one of RandomForest, Linear, Ridge, Lasso, ElasticNet",
                name
            ),
            _ => {
                warn!("Unknown model '{}', falling back to RandomForest", name);
                ModelKind::RandomForest
            }
        };
        Ok(kind)
    }
}

/// One point of the hyperparameter grid.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Forest {
        n_trees: usize,
        max_depth: Option<u16>,
        min_samples_split: usize,
    },
    Linear {
        solver: LinearSolver,
    },
    Ridge {
        alpha: f64,
    },
    Lasso {
        alpha: f64,
    },
    ElasticNet {
        alpha: f64,
        l1_ratio: f64,
    },
}

/// Least-squares solver for plain linear regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearSolver {
    Svd,
    Qr,
}

impl LinearSolver {
    fn name(&self) -> &'static str {
        match self {
            LinearSolver::Svd => "svd",
            LinearSolver::Qr => "qr",
        }
    }

    fn to_smartcore(self) -> LinearRegressionSolverName {
        match self {
            LinearSolver::Svd => LinearRegressionSolverName::SVD,
            LinearSolver::Qr => LinearRegressionSolverName::QR,
        }
    }
}

impl Candidate {
    pub fn params(&self) -> BTreeMap<String, String> {
        match self {
            Candidate::Forest {
                n_trees,
                max_depth,
                min_samples_split,
            } => BTreeMap::from([
                ("n_estimators".to_string(), n_trees.to_string()),
                (
                    "max_depth".to_string(),
                    max_depth.map_or("none".to_string(), |d| d.to_string()),
                ),
                ("min_samples_split".to_string(), min_samples_split.to_string()),
            ]),
            Candidate::Linear { solver } => {
                BTreeMap::from([("solver".to_string(), solver.name().to_string())])
            }
            Candidate::Ridge { alpha } | Candidate::Lasso { alpha } => {
                BTreeMap::from([("alpha".to_string(), alpha.to_string())])
            }
            Candidate::ElasticNet { alpha, l1_ratio } => BTreeMap::from([
                ("alpha".to_string(), alpha.to_string()),
                ("l1_ratio".to_string(), l1_ratio.to_string()),
            ]),
        }
    }

    fn fit(&self, x: &DenseMatrix<f64>, y: &Vec<f64>, seed: u64) -> Result<Regressor> {
        match self {
            Candidate::Forest {
                n_trees,
                max_depth,
                min_samples_split,
            } => {
                let mut params = RandomForestRegressorParameters::default()
                    .with_n_trees(*n_trees)
                    .with_min_samples_split(*min_samples_split)
                    .with_seed(seed);
                if let Some(depth) = max_depth {
                    params = params.with_max_depth(*depth);
                }
                let model = RandomForestRegressor::fit(x, y, params)
                    .map_err(|e| anyhow!("Training error: {}", e))?;
                Ok(Regressor::RandomForest(model))
            }
            Candidate::Ridge { alpha } => {
                // Columns arrive standardized; smartcore's own rescaling
                // rejects the constant one-hot columns a fold can contain.
                let params = RidgeRegressionParameters::<f64>::default()
                    .with_alpha(*alpha)
                    .with_normalize(false);
                let model = RidgeRegression::fit(x, y, params)
                    .map_err(|e| anyhow!("Training error: {}", e))?;
                Ok(Regressor::Ridge(model))
            }
            Candidate::Linear { solver } => {
                let params =
                    LinearRegressionParameters::default().with_solver(solver.to_smartcore());
                let model = LinearRegression::fit(x, y, params)
                    .map_err(|e| anyhow!("Training error: {}", e))?;
                Ok(Regressor::Linear(model))
            }
            Candidate::Lasso { alpha } => {
                let params = LassoParameters::default()
                    .with_alpha(*alpha)
                    .with_normalize(false);
                let model =
                    Lasso::fit(x, y, params).map_err(|e| anyhow!("Training error: {}", e))?;
                Ok(Regressor::Lasso(model))
            }
            Candidate::ElasticNet { alpha, l1_ratio } => {
                let params = ElasticNetParameters::default()
                    .with_alpha(*alpha)
                    .with_l1_ratio(*l1_ratio)
                    .with_normalize(false);
                let model = ElasticNet::fit(x, y, params)
                    .map_err(|e| anyhow!("Training error: {}", e))?;
                Ok(Regressor::ElasticNet(model))
            }
        }
    }
}

/// Expands the configured base parameters into the search grid.
///
/// Random forest: `n_estimators ∈ {base, 300}` × `max_depth ∈ {base, 10, 20}`.
/// Linear: `solver ∈ {svd, qr}`.
/// Ridge and lasso: `alpha ∈ {base, 0.1, 10}`.
/// Elastic net: `alpha ∈ {base, 0.1}` × `l1_ratio ∈ {base, 0.2, 0.8}`.
pub fn parameter_grid(kind: ModelKind, base: &ModelParameters) -> Vec<Candidate> {
    match kind {
        ModelKind::RandomForest => {
            let min_samples_split = base.min_samples_split.unwrap_or(2);
            let n_trees = dedup(vec![base.n_estimators.unwrap_or(200), 300]);
            let depths = dedup(vec![base.max_depth, Some(10), Some(20)]);

            let mut grid = Vec::new();
            for &n in &n_trees {
                for &d in &depths {
                    grid.push(Candidate::Forest {
                        n_trees: n,
                        max_depth: d,
                        min_samples_split,
                    });
                }
            }
            grid
        }
        ModelKind::Linear => vec![
            Candidate::Linear {
                solver: LinearSolver::Svd,
            },
            Candidate::Linear {
                solver: LinearSolver::Qr,
            },
        ],
        ModelKind::Ridge => alpha_grid(base)
            .into_iter()
            .map(|alpha| Candidate::Ridge { alpha })
            .collect(),
        ModelKind::Lasso => alpha_grid(base)
            .into_iter()
            .map(|alpha| Candidate::Lasso { alpha })
            .collect(),
        ModelKind::ElasticNet => {
            let alphas = dedup(vec![base.alpha.unwrap_or(1.0), 0.1]);
            let ratios = dedup(vec![base.l1_ratio.unwrap_or(0.5), 0.2, 0.8]);
            let mut grid = Vec::new();
            for &alpha in &alphas {
                for &l1_ratio in &ratios {
                    grid.push(Candidate::ElasticNet { alpha, l1_ratio });
                }
            }
            grid
        }
    }
}

fn alpha_grid(base: &ModelParameters) -> Vec<f64> {
    dedup(vec![base.alpha.unwrap_or(1.0), 0.1, 10.0])
}

fn dedup<T: PartialEq>(values: Vec<T>) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// RMSE, MAE and R² of predictions against targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Self {
        let n = actual.len().max(1) as f64;
        let mean = actual.iter().sum::<f64>() / n;
        let (mut sse, mut sae, mut sst) = (0.0, 0.0, 0.0);
        for (a, p) in actual.iter().zip(predicted) {
            sse += (a - p).powi(2);
            sae += (a - p).abs();
            sst += (a - mean).powi(2);
        }
        let r2 = if sst > 0.0 { 1.0 - sse / sst } else { 0.0 };
        Self {
            rmse: (sse / n).sqrt(),
            mae: sae / n,
            r2,
        }
    }
}

/// Contents of `metrics.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    /// Mean out-of-fold RMSE of the selected candidate
    pub cv_rmse: f64,
    pub n_samples: usize,
}

pub struct TrainingOutcome {
    pub pipeline: ModelPipeline,
    pub metrics: TrainingMetrics,
    pub best_params: BTreeMap<String, String>,
    pub model_kind: ModelKind,
}

/// Encoded design matrix.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub layout: FeatureLayout,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

/// Resolves the feature selection against the table and encodes every
/// usable row. Rows with unknown categories or missing values are skipped.
pub fn build_training_set(
    table: &RawTable,
    config: &TrainingConfig,
    reference_year: i32,
) -> Result<TrainingSet> {
    let target = &config.model.target_variable;
    let target_col = table
        .column_index(target)
        .with_context(|| format!("Target column '{}' not found", target))?;

    let requested: Vec<String> = match &config.model.features {
        Some(features) if !features.is_empty() => features.clone(),
        _ => DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect(),
    };

    let mut selection = Vec::new();
    let mut missing = Vec::new();
    for name in requested {
        if name == *target || TARGET_DERIVED_FEATURES.contains(&name.as_str()) {
            warn!("Dropping '{}' from features: derived from the target", name);
        } else if !is_derivable(&name) && !table.has_column(&name) {
            missing.push(name);
        } else {
            selection.push(name);
        }
    }
    if !missing.is_empty() {
        warn!("Missing features from config (ignored): {:?}", missing);
    }

    let layout = FeatureLayout::from_selection(&selection).context("Invalid feature selection")?;

    let mut x = Vec::with_capacity(table.len());
    let mut y = Vec::with_capacity(table.len());
    let mut skipped = 0usize;
    for (i, row) in table.rows().iter().enumerate() {
        let Some(price) = parse_number(&row[target_col]) else {
            skipped += 1;
            continue;
        };
        match record_from_row(table, i, reference_year) {
            Some(record) => {
                x.push(layout.encode(&record).into_inner());
                y.push(price);
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("Skipped {} rows with missing or unknown values", skipped);
    }
    if x.is_empty() {
        bail!("No usable training rows");
    }

    info!(
        "Training set: {} rows x {} columns",
        x.len(),
        layout.len()
    );
    Ok(TrainingSet { layout, x, y })
}

fn is_derivable(name: &str) -> bool {
    matches!(name, "house_age" | "bed_bath_ratio" | "total_rooms")
}

/// Builds the record for row `i`, preferring engineered columns and deriving
/// them with the serving formulas when absent.
fn record_from_row(table: &RawTable, i: usize, reference_year: i32) -> Option<DerivedFeatureRecord> {
    let number = |name: &str| table.cell(i, name).and_then(parse_number);

    let sqft = number("sqft")?;
    let bedrooms = number("bedrooms")?;
    let bathrooms = number("bathrooms")?;
    let year_built = number("year_built")?.round() as i32;
    let location: Location = table.cell(i, "location")?.parse().ok()?;
    let condition: Condition = table.cell(i, "condition")?.parse().ok()?;
    if bedrooms < 0.0 {
        return None;
    }

    Some(DerivedFeatureRecord {
        sqft,
        bedrooms: bedrooms.round() as u32,
        bathrooms,
        location,
        year_built,
        condition,
        house_age: number("house_age").unwrap_or_else(|| house_age(reference_year, year_built)),
        bed_bath_ratio: number("bed_bath_ratio")
            .unwrap_or_else(|| bed_bath_ratio(bedrooms, bathrooms)),
        total_rooms: match number("total_rooms") {
            Some(v) => TotalRooms::Supplied(v),
            None => TotalRooms::Derived(bedrooms + bathrooms),
        },
    })
}

/// Assigns each row to one of `k` folds after a seeded shuffle.
pub fn kfold_indices(n: usize, k: usize, seed: u64) -> Vec<(Vec<usize>, Vec<usize>)> {
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    (0..k)
        .map(|fold| {
            let mut train = Vec::new();
            let mut test = Vec::new();
            for (pos, &idx) in order.iter().enumerate() {
                if pos % k == fold {
                    test.push(idx);
                } else {
                    train.push(idx);
                }
            }
            (train, test)
        })
        .collect()
}

fn fit_pipeline(
    candidate: &Candidate,
    layout: &FeatureLayout,
    x: &[Vec<f64>],
    y: &[f64],
    seed: u64,
    name: &str,
) -> Result<ModelPipeline> {
    let scaler = StandardScaler::fit(x, layout);
    let scaled: Vec<Vec<f64>> = x.iter().map(|r| scaler.transform(r)).collect();
    let matrix =
        DenseMatrix::from_2d_vec(&scaled).map_err(|e| anyhow!("Matrix error: {}", e))?;
    let target_offset = y.iter().sum::<f64>() / y.len().max(1) as f64;
    let centered: Vec<f64> = y.iter().map(|v| v - target_offset).collect();
    let regressor = candidate.fit(&matrix, &centered, seed)?;

    let trained_at = Utc::now();
    Ok(ModelPipeline {
        name: name.to_string(),
        version: trained_at.format("%Y%m%d%H%M%S").to_string(),
        trained_at,
        feature_names: layout.names(),
        scaler,
        target_offset,
        regressor,
        feature_importances: None,
    })
}

fn cross_validate(
    candidate: &Candidate,
    set: &TrainingSet,
    folds: &[(Vec<usize>, Vec<usize>)],
    seed: u64,
) -> Result<f64> {
    let mut fold_rmse = Vec::with_capacity(folds.len());
    for (train, test) in folds {
        let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
            (
                idx.iter().map(|&i| set.x[i].clone()).collect(),
                idx.iter().map(|&i| set.y[i]).collect(),
            )
        };
        let (x_train, y_train) = pick(train);
        let (x_test, y_test) = pick(test);

        let pipeline = fit_pipeline(candidate, &set.layout, &x_train, &y_train, seed, "cv")?;
        let predicted = pipeline.predict_rows(&x_test)?;
        fold_rmse.push(RegressionMetrics::evaluate(&y_test, &predicted).rmse);
    }
    Ok(fold_rmse.iter().sum::<f64>() / fold_rmse.len().max(1) as f64)
}

/// Mean RMSE increase when each column is shuffled, normalized to sum to 1.
pub fn permutation_importances(
    pipeline: &ModelPipeline,
    x: &[Vec<f64>],
    y: &[f64],
    seed: u64,
) -> Result<Vec<f64>> {
    let baseline = RegressionMetrics::evaluate(y, &pipeline.predict_rows(x)?).rmse;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut raw = Vec::with_capacity(pipeline.width());
    for j in 0..pipeline.width() {
        let mut column: Vec<f64> = x.iter().map(|r| r[j]).collect();
        column.shuffle(&mut rng);
        let permuted: Vec<Vec<f64>> = x
            .iter()
            .zip(&column)
            .map(|(row, v)| {
                let mut row = row.clone();
                row[j] = *v;
                row
            })
            .collect();
        let rmse = RegressionMetrics::evaluate(y, &pipeline.predict_rows(&permuted)?).rmse;
        raw.push((rmse - baseline).max(0.0));
    }

    let total: f64 = raw.iter().sum();
    if total > 0.0 {
        Ok(raw.iter().map(|v| v / total).collect())
    } else {
        Ok(vec![0.0; raw.len()])
    }
}

/// Grid search with k-fold CV, refit of the best candidate on all rows,
/// in-sample evaluation and importances.
pub fn train(set: &TrainingSet, config: &TrainingConfig) -> Result<TrainingOutcome> {
    let kind = ModelKind::from_name(&config.model.best_model)?;
    let grid = parameter_grid(kind, &config.model.parameters);
    let k = config.cv.min(set.x.len());
    if k < 2 {
        bail!(
            "Cross-validation needs at least 2 folds, got cv={} with {} rows",
            config.cv,
            set.x.len()
        );
    }
    let folds = kfold_indices(set.x.len(), k, config.seed);
    info!(
        "Grid search: {:?}, {} candidates, cv={}",
        kind,
        grid.len(),
        k
    );

    let scored: Vec<(Candidate, Result<f64>)> = grid
        .into_par_iter()
        .map(|candidate| {
            let score = cross_validate(&candidate, set, &folds, config.seed);
            (candidate, score)
        })
        .collect();

    let mut best: Option<(Candidate, f64)> = None;
    for (candidate, score) in scored {
        match score {
            Ok(rmse) if !rmse.is_finite() => {
                warn!("Candidate {:?} produced non-finite CV RMSE", candidate.params());
            }
            Ok(rmse) => {
                info!("CV RMSE {:.4} for {:?}", rmse, candidate.params());
                if best.as_ref().is_none_or(|(_, b)| rmse < *b) {
                    best = Some((candidate, rmse));
                }
            }
            Err(e) => warn!("Candidate {:?} failed: {:#}", candidate.params(), e),
        }
    }
    let (candidate, cv_rmse) = best.ok_or_else(|| anyhow!("Every grid candidate failed"))?;
    info!("Best params: {:?}", candidate.params());

    let mut pipeline = fit_pipeline(
        &candidate,
        &set.layout,
        &set.x,
        &set.y,
        config.seed,
        &config.model.name,
    )?;
    let fitted = pipeline.predict_rows(&set.x)?;
    let eval = RegressionMetrics::evaluate(&set.y, &fitted);
    info!(
        "Metrics: rmse={:.4} mae={:.4} r2={:.4}",
        eval.rmse, eval.mae, eval.r2
    );

    if pipeline.regressor.supports_importances() {
        pipeline.feature_importances =
            Some(permutation_importances(&pipeline, &set.x, &set.y, config.seed)?);
    }

    Ok(TrainingOutcome {
        metrics: TrainingMetrics {
            rmse: eval.rmse,
            mae: eval.mae,
            r2: eval.r2,
            cv_rmse,
            n_samples: set.x.len(),
        },
        best_params: candidate.params(),
        pipeline,
        model_kind: kind,
    })
}

/// Serialized artifacts, in the order they are written.
pub fn artifact_bytes(outcome: &TrainingOutcome, keys: &ArtifactKeys) -> Result<Vec<(String, Vec<u8>)>> {
    Ok(vec![
        (
            keys.model.clone(),
            serde_json::to_vec(&outcome.pipeline).context("Failed to serialize model pipeline")?,
        ),
        (
            keys.feature_names.clone(),
            serde_json::to_vec_pretty(&outcome.pipeline.feature_names)
                .context("Failed to serialize feature names")?,
        ),
        (
            keys.metrics.clone(),
            serde_json::to_vec_pretty(&outcome.metrics).context("Failed to serialize metrics")?,
        ),
    ])
}

/// Configured base parameters that were set, as `name -> value`.
fn config_params(params: &ModelParameters) -> BTreeMap<&'static str, String> {
    let mut out = BTreeMap::new();
    if let Some(v) = params.n_estimators {
        out.insert("n_estimators", v.to_string());
    }
    if let Some(v) = params.max_depth {
        out.insert("max_depth", v.to_string());
    }
    if let Some(v) = params.min_samples_split {
        out.insert("min_samples_split", v.to_string());
    }
    if let Some(v) = params.alpha {
        out.insert("alpha", v.to_string());
    }
    if let Some(v) = params.l1_ratio {
        out.insert("l1_ratio", v.to_string());
    }
    out
}

/// Trains on `table`, writes the artifacts to `store` and, when given,
/// records the run with `tracker`.
pub fn train_and_export(
    table: &RawTable,
    config: &TrainingConfig,
    reference_year: i32,
    store: &dyn ArtifactStore,
    keys: &ArtifactKeys,
    tracker: Option<&dyn ExperimentTracker>,
) -> Result<TrainingOutcome> {
    let set = build_training_set(table, config, reference_year)?;
    let outcome = train(&set, config)?;

    let artifacts = artifact_bytes(&outcome, keys)?;
    for (key, bytes) in &artifacts {
        store
            .put(key, bytes)
            .with_context(|| format!("Failed to store artifact {}", key))?;
    }
    info!("Saved artifacts to {}", store.describe());

    if let Some(tracker) = tracker {
        let mut run = ExperimentRun::new(&config.experiment);
        run.log_param("target", &config.model.target_variable);
        run.log_param("model_name", &config.model.best_model);
        run.log_param("cv", config.cv);
        for (k, v) in &outcome.best_params {
            run.log_param(k.clone(), v);
        }
        for (k, v) in config_params(&config.model.parameters) {
            run.log_param(format!("cfg_{}", k), v);
        }
        run.log_metric("rmse", outcome.metrics.rmse);
        run.log_metric("mae", outcome.metrics.mae);
        run.log_metric("r2", outcome.metrics.r2);
        run.log_metric("cv_rmse", outcome.metrics.cv_rmse);

        let refs: Vec<(&str, &[u8])> = artifacts
            .iter()
            .map(|(k, b)| (k.as_str(), b.as_slice()))
            .collect();
        tracker.record(&run, &refs)?;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_parse() {
        let config = TrainingConfig::from_toml_str(
            r#"
            cv = 3
            [model]
            best_model = "Ridge"
            features = ["sqft", "price_per_sqft"]
            [model.parameters]
            alpha = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.cv, 3);
        assert_eq!(config.seed, 42);
        assert_eq!(config.model.target_variable, "price");
        assert_eq!(config.model.parameters.alpha, Some(0.5));

        let empty = TrainingConfig::from_toml_str("").unwrap();
        assert_eq!(empty, TrainingConfig::default());
    }

    #[test]
    fn test_model_kind_names() {
        let kind = |name: &str| ModelKind::from_name(name).unwrap();
        assert_eq!(kind("RandomForest"), ModelKind::RandomForest);
        assert_eq!(kind("random_forest"), ModelKind::RandomForest);
        assert_eq!(kind("rf"), ModelKind::RandomForest);
        assert_eq!(kind("LinearRegression"), ModelKind::Linear);
        assert_eq!(kind("linear"), ModelKind::Linear);
        assert_eq!(kind("Ridge"), ModelKind::Ridge);
        assert_eq!(kind("Lasso"), ModelKind::Lasso);
        assert_eq!(kind("ElasticNet"), ModelKind::ElasticNet);
        assert_eq!(kind("elastic_net"), ModelKind::ElasticNet);
        // Unknown names fall back.
        assert_eq!(kind("MysteryModel"), ModelKind::RandomForest);
    }

    #[test]
    fn test_unavailable_model_is_an_error() {
        for name in ["SVR", "gbr", "ExtraTrees", "XGBoost"] {
            let err = ModelKind::from_name(name).unwrap_err();
            assert!(err.to_string().contains(name), "{err}");
        }

        let config = TrainingConfig {
            model: ModelSection {
                best_model: "svr".to_string(),
                ..ModelSection::default()
            },
            ..TrainingConfig::default()
        };
        let set = build_training_set(&featured_table(), &config, 2024).unwrap();
        assert!(train(&set, &config).is_err());
    }

    #[test]
    fn test_linear_family_grids() {
        let linear = parameter_grid(ModelKind::Linear, &ModelParameters::default());
        assert_eq!(linear.len(), 2);

        let lasso = parameter_grid(
            ModelKind::Lasso,
            &ModelParameters {
                alpha: Some(0.1),
                ..Default::default()
            },
        );
        assert_eq!(
            lasso,
            vec![Candidate::Lasso { alpha: 0.1 }, Candidate::Lasso { alpha: 10.0 }]
        );

        let elastic = parameter_grid(ModelKind::ElasticNet, &ModelParameters::default());
        assert_eq!(elastic.len(), 6);
        assert_eq!(
            elastic[0],
            Candidate::ElasticNet {
                alpha: 1.0,
                l1_ratio: 0.5
            }
        );
        assert_eq!(
            elastic[0].params().get("l1_ratio").map(String::as_str),
            Some("0.5")
        );
    }

    #[test]
    fn test_forest_grid() {
        let grid = parameter_grid(ModelKind::RandomForest, &ModelParameters::default());
        assert_eq!(grid.len(), 6);
        assert_eq!(
            grid[0],
            Candidate::Forest {
                n_trees: 200,
                max_depth: None,
                min_samples_split: 2
            }
        );

        let base = ModelParameters {
            n_estimators: Some(300),
            max_depth: Some(10),
            ..Default::default()
        };
        // Duplicates of the base values collapse.
        assert_eq!(parameter_grid(ModelKind::RandomForest, &base).len(), 2);
    }

    #[test]
    fn test_ridge_grid() {
        let grid = parameter_grid(ModelKind::Ridge, &ModelParameters::default());
        assert_eq!(
            grid,
            vec![
                Candidate::Ridge { alpha: 1.0 },
                Candidate::Ridge { alpha: 0.1 },
                Candidate::Ridge { alpha: 10.0 }
            ]
        );
    }

    #[test]
    fn test_kfold_partitions_rows() {
        let folds = kfold_indices(10, 3, 7);
        assert_eq!(folds.len(), 3);
        let mut seen: Vec<usize> = folds.iter().flat_map(|(_, test)| test.clone()).collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), 10);
            assert!(test.iter().all(|i| !train.contains(i)));
        }
        assert_eq!(kfold_indices(10, 3, 7), folds);
    }

    #[test]
    fn test_metrics() {
        let m = RegressionMetrics::evaluate(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.r2, 1.0);

        let m = RegressionMetrics::evaluate(&[1.0, 3.0], &[2.0, 2.0]);
        assert_eq!(m.rmse, 1.0);
        assert_eq!(m.mae, 1.0);
        assert_eq!(m.r2, 0.0);
    }

    fn featured_table() -> RawTable {
        let mut csv = String::from(
            "price,sqft,bedrooms,bathrooms,location,year_built,condition,price_per_sqft\n",
        );
        let locations = ["Urban", "Rural", "Suburb", "Downtown"];
        let conditions = ["Good", "Fair", "Excellent", "Poor"];
        for i in 0..40 {
            let sqft = 800 + i * 50;
            let price = sqft * 200 + (i % 4) * 10_000;
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                price,
                sqft,
                2 + i % 3,
                1 + i % 2,
                locations[(i % 4) as usize],
                1960 + i,
                conditions[(i % 4) as usize],
                price / sqft
            ));
        }
        csv.push_str("100000,1000,3,2,Atlantis,2000,Good,100\n");
        RawTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_training_set_drops_leakage_and_unknown_categories() {
        let config = TrainingConfig {
            model: ModelSection {
                features: Some(vec![
                    "sqft".to_string(),
                    "location".to_string(),
                    "price_per_sqft".to_string(),
                    "lot_size".to_string(),
                ]),
                ..ModelSection::default()
            },
            ..TrainingConfig::default()
        };
        let set = build_training_set(&featured_table(), &config, 2024).unwrap();

        assert!(!set.layout.names().iter().any(|n| n == "price_per_sqft"));
        assert_eq!(set.layout.len(), 7);
        // Atlantis row skipped.
        assert_eq!(set.x.len(), 40);
    }

    #[test]
    fn test_missing_target() {
        let table = RawTable::from_reader("sqft\n1000\n".as_bytes()).unwrap();
        let err = build_training_set(&table, &TrainingConfig::default(), 2024).unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_ridge_training_end_to_end() {
        let config = TrainingConfig {
            cv: 3,
            model: ModelSection {
                best_model: "Ridge".to_string(),
                ..ModelSection::default()
            },
            ..TrainingConfig::default()
        };
        let set = build_training_set(&featured_table(), &config, 2024).unwrap();
        let outcome = train(&set, &config).unwrap();

        assert_eq!(outcome.model_kind, ModelKind::Ridge);
        assert_eq!(outcome.pipeline.regressor.kind(), "ridge");
        assert!(outcome.pipeline.feature_importances.is_none());
        assert_eq!(outcome.pipeline.feature_names, set.layout.names());
        assert!(outcome.metrics.r2 > 0.9, "r2 = {}", outcome.metrics.r2);
        assert_eq!(outcome.metrics.n_samples, 40);
    }

    fn train_kind(best_model: &str) -> TrainingOutcome {
        let config = TrainingConfig {
            cv: 3,
            model: ModelSection {
                best_model: best_model.to_string(),
                ..ModelSection::default()
            },
            ..TrainingConfig::default()
        };
        let set = build_training_set(&featured_table(), &config, 2024).unwrap();
        train(&set, &config).unwrap()
    }

    #[test]
    fn test_linear_regression_training() {
        let outcome = train_kind("LinearRegression");
        assert_eq!(outcome.model_kind, ModelKind::Linear);
        assert_eq!(outcome.pipeline.regressor.kind(), "linear");
        assert!(outcome.best_params.contains_key("solver"));
        assert!(outcome.metrics.r2 > 0.9, "r2 = {}", outcome.metrics.r2);
    }

    #[test]
    fn test_lasso_training() {
        let outcome = train_kind("Lasso");
        assert_eq!(outcome.model_kind, ModelKind::Lasso);
        assert_eq!(outcome.pipeline.regressor.kind(), "lasso");
        assert!(outcome.pipeline.feature_importances.is_none());
        assert!(outcome.metrics.r2 > 0.8, "r2 = {}", outcome.metrics.r2);
    }

    #[test]
    fn test_elastic_net_training() {
        let outcome = train_kind("ElasticNet");
        assert_eq!(outcome.model_kind, ModelKind::ElasticNet);
        assert_eq!(outcome.pipeline.regressor.kind(), "elastic_net");
        assert!(outcome.best_params.contains_key("l1_ratio"));
        assert!(outcome.metrics.r2 > 0.8, "r2 = {}", outcome.metrics.r2);
    }

    #[test]
    fn test_linear_family_pipeline_survives_serialization() {
        for name in ["LinearRegression", "Lasso", "ElasticNet"] {
            let outcome = train_kind(name);
            let bytes = serde_json::to_vec(&outcome.pipeline).unwrap();
            let restored: ModelPipeline = serde_json::from_slice(&bytes).unwrap();

            let rows = vec![vec![0.0; restored.width()]];
            let before = outcome.pipeline.predict_rows(&rows).unwrap();
            let after = restored.predict_rows(&rows).unwrap();
            assert!((before[0] - after[0]).abs() < 1e-6, "{name}");
        }
    }

    #[test]
    fn test_export_records_configured_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = crate::infrastructure::FileExperimentTracker::new(dir.path());
        let store = crate::infrastructure::InMemoryArtifactStore::new();
        let config = TrainingConfig {
            cv: 3,
            model: ModelSection {
                best_model: "Lasso".to_string(),
                parameters: ModelParameters {
                    alpha: Some(0.5),
                    n_estimators: Some(50),
                    ..Default::default()
                },
                ..ModelSection::default()
            },
            ..TrainingConfig::default()
        };

        train_and_export(
            &featured_table(),
            &config,
            2024,
            &store,
            &ArtifactKeys::default(),
            Some(&tracker as &dyn ExperimentTracker),
        )
        .unwrap();

        let runs = tracker.runs(&config.experiment).unwrap();
        let params = &runs[0].params;
        assert_eq!(params.get("cfg_alpha").map(String::as_str), Some("0.5"));
        assert_eq!(params.get("cfg_n_estimators").map(String::as_str), Some("50"));
        assert!(!params.contains_key("cfg_l1_ratio"));
        assert_eq!(params.get("model_name").map(String::as_str), Some("Lasso"));
    }

    #[test]
    fn test_forest_training_has_normalized_importances() {
        let config = TrainingConfig {
            cv: 2,
            model: ModelSection {
                features: Some(vec!["sqft".to_string(), "bedrooms".to_string()]),
                parameters: ModelParameters {
                    n_estimators: Some(10),
                    ..Default::default()
                },
                ..ModelSection::default()
            },
            ..TrainingConfig::default()
        };
        let set = build_training_set(&featured_table(), &config, 2024).unwrap();
        let outcome = train(&set, &config).unwrap();

        let importances = outcome.pipeline.feature_importances.unwrap();
        assert_eq!(importances.len(), 2);
        let total: f64 = importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9 || total == 0.0);
        assert!(importances.iter().all(|v| *v >= 0.0));
    }
}
