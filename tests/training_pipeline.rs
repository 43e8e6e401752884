mod common;

use common::{raw_csv, ridge_config, sample_request, small_forest_config};
use house_price::application::ml::{ModelState, PricePredictor, SmartCorePredictor};
use house_price::application::prediction_service::PredictionService;
use house_price::application::training::{
    RawTable, clean, engineer_dataset, process_dataset, train_and_export,
};
use house_price::domain::config::PredictionPolicy;
use house_price::domain::ports::SystemClock;
use house_price::domain::repositories::ArtifactKeys;
use house_price::domain::repositories::ExperimentTracker;
use house_price::infrastructure::{FileExperimentTracker, FsArtifactStore};
use std::fs;
use std::sync::Arc;

/// Clean synthetic rows plus the defects cleaning is expected to remove.
fn messy_csv() -> String {
    let clean_rows = raw_csv(120);
    let mut lines: Vec<String> = clean_rows.lines().map(str::to_string).collect();
    lines[0] = "Price,SQFT,Bedrooms,Bathrooms,Location,Year Built,Condition".to_string();

    // Missing cells are imputed, not dropped.
    lines.push("310000,,3,2,Urban,1990,".to_string());
    // Negative value.
    lines.push("250000,-100,2,1,Rural,1980,Good".to_string());
    // Price outlier.
    lines.push("90000000,2000,3,2,Waterfront,2000,Excellent".to_string());
    // Exact duplicate of the first data row.
    let first = lines[1].clone();
    lines.push(first);

    lines.join("\n") + "\n"
}

#[test]
fn test_cleaning_report_counts_each_defect() {
    let mut table = RawTable::from_reader(messy_csv().as_bytes()).unwrap();
    let report = clean(&mut table);

    assert_eq!(report.rows_in, 124);
    assert_eq!(report.cells_imputed, 2);
    assert_eq!(report.negative_rows, 1);
    assert_eq!(report.outlier_rows, 1);
    assert_eq!(report.duplicate_rows, 1);
    assert_eq!(report.rows_out, 121);
    assert!(table.has_column("year_built"));
    assert!(table.has_column("sqft"));
}

#[test]
fn test_raw_csv_to_served_prediction() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = tempfile::tempdir()?;

    let raw = dir.path().join("raw").join("house_data.csv");
    fs::create_dir_all(raw.parent().unwrap())?;
    fs::write(&raw, messy_csv())?;

    let cleaned = process_dataset(&raw, &dir.path().join("processed"))?;
    assert!(cleaned.ends_with("cleaned_data.csv"));

    let featured = dir.path().join("processed").join("featured_house_data.csv");
    engineer_dataset(&cleaned, &featured, 2024)?;
    let table = RawTable::read_csv(&featured)?;
    assert!(table.has_column("price_per_sqft"));
    assert!(table.has_column("house_age"));

    let store = FsArtifactStore::new(dir.path().join("models"));
    let tracker = FileExperimentTracker::new(dir.path().join("mlruns"));
    let config = small_forest_config();
    let outcome = train_and_export(
        &table,
        &config,
        2024,
        &store,
        &ArtifactKeys::default(),
        Some(&tracker as &dyn ExperimentTracker),
    )?;

    assert!(!outcome.pipeline.feature_names.contains(&"price_per_sqft".to_string()));
    assert!(outcome.metrics.r2 > 0.5, "r2 = {}", outcome.metrics.r2);
    assert!(store.path_for("model_pipeline.json").exists());
    assert!(store.path_for("feature_names.json").exists());
    assert!(store.path_for("metrics.json").exists());

    let runs = tracker.runs(&config.experiment)?;
    assert_eq!(runs.len(), 1);
    assert!(runs[0].metrics.contains_key("rmse"));
    assert!(runs[0].artifacts.contains(&"model_pipeline.json".to_string()));

    let predictor = SmartCorePredictor::load(&store, &ArtifactKeys::default())?;
    assert_eq!(predictor.layout().names(), outcome.pipeline.feature_names);

    let service = PredictionService::new(
        ModelState::load(&store, &ArtifactKeys::default()),
        &PredictionPolicy::default(),
        Arc::new(SystemClock),
    );
    let result = service.predict(&sample_request())?;
    assert!(result.predicted_price > 0.0);
    assert!(!result.features_importance.is_empty());
    Ok(())
}

#[test]
fn test_retraining_overwrites_artifacts() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FsArtifactStore::new(dir.path());
    let table = RawTable::from_reader(raw_csv(60).as_bytes())?;
    let keys = ArtifactKeys::default();

    let mut first_config = ridge_config();
    first_config.model.features = Some(vec!["sqft".to_string(), "location".to_string()]);
    train_and_export(&table, &first_config, 2024, &store, &keys, None)?;
    assert_eq!(SmartCorePredictor::load(&store, &keys)?.layout().len(), 7);

    train_and_export(&table, &ridge_config(), 2024, &store, &keys, None)?;
    assert_eq!(SmartCorePredictor::load(&store, &keys)?.layout().len(), 17);
    Ok(())
}
