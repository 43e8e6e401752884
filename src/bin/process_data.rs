//! Clean a raw housing CSV and write `<output>/cleaned_data.csv`.
//!
//! Steps: standardize column names, impute missing values, drop negative
//! values, remove price outliers (1.5×IQR), drop duplicates.

use anyhow::Result;
use clap::Parser;
use house_price::application::training::process_dataset;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Clean raw dataset and write cleaned_data.csv", long_about = None)]
struct Args {
    /// Path to raw CSV file
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let output = process_dataset(&args.input, &args.output)?;
    info!("Done: {:?}", output);
    Ok(())
}
