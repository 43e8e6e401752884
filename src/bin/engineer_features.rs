//! Deterministic feature engineering on cleaned data.
//!
//! Adds `price_per_sqft`, `bed_bath_ratio`, `total_rooms` and `house_age`.

use anyhow::Result;
use chrono::{Datelike, Utc};
use clap::Parser;
use house_price::application::training::engineer_dataset;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Deterministic feature engineering", long_about = None)]
struct Args {
    /// Path to cleaned CSV
    #[arg(short, long)]
    input: PathBuf,

    /// Path to write the featured CSV
    #[arg(short, long)]
    output: PathBuf,

    /// Year used for house_age (default: current year)
    #[arg(long)]
    reference_year: Option<i32>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let year = args.reference_year.unwrap_or_else(|| Utc::now().year());
    info!("Reference year: {}", year);
    engineer_dataset(&args.input, &args.output, year)
}
