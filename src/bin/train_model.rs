//! Train the price model with cross-validated grid search.
//!
//! Writes `model_pipeline.json`, `feature_names.json` and `metrics.json` to
//! `--models-dir`, and records the run under `--tracking-dir` when given.
//!
//! # Usage
//! ```sh
//! cargo run --release --bin train_model -- \
//!     --config configs/model_config.toml \
//!     --data data/featured/featured_house_data.csv \
//!     --models-dir models/trained
//! ```

use anyhow::Result;
use chrono::{Datelike, Utc};
use clap::Parser;
use house_price::application::training::{RawTable, TrainingConfig, train_and_export};
use house_price::domain::repositories::{ArtifactKeys, ExperimentTracker};
use house_price::infrastructure::{FileExperimentTracker, FsArtifactStore};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Train model with grid search and experiment tracking", long_about = None)]
struct Args {
    /// TOML training config
    #[arg(long)]
    config: PathBuf,

    /// Featured training data CSV
    #[arg(long)]
    data: PathBuf,

    /// Output directory for model artifacts
    #[arg(long, default_value = "models/trained")]
    models_dir: PathBuf,

    /// Directory for experiment tracking runs
    #[arg(long)]
    tracking_dir: Option<PathBuf>,

    /// Year used to derive house_age when the data lacks it
    #[arg(long)]
    reference_year: Option<i32>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let config = TrainingConfig::load(&args.config)?;
    info!("Loading featured data: {:?}", args.data);
    let table = RawTable::read_csv(&args.data)?;

    let store = FsArtifactStore::new(&args.models_dir);
    let tracker = args.tracking_dir.as_ref().map(FileExperimentTracker::new);
    let year = args.reference_year.unwrap_or_else(|| Utc::now().year());

    let outcome = train_and_export(
        &table,
        &config,
        year,
        &store,
        &ArtifactKeys::default(),
        tracker.as_ref().map(|t| t as &dyn ExperimentTracker),
    )?;

    info!(
        "Training completed: {} {} (rmse={:.2}, mae={:.2}, r2={:.4})",
        outcome.pipeline.name,
        outcome.pipeline.version,
        outcome.metrics.rmse,
        outcome.metrics.mae,
        outcome.metrics.r2
    );
    Ok(())
}
