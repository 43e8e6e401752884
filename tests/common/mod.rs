#![allow(dead_code)]

use house_price::application::training::trainer::{ModelParameters, ModelSection};
use house_price::application::training::{RawTable, TrainingConfig, train_and_export};
use house_price::domain::housing::PredictionRequest;
use house_price::domain::repositories::ArtifactKeys;
use house_price::infrastructure::InMemoryArtifactStore;

pub const LOCATIONS: [&str; 6] = ["Downtown", "Mountain", "Rural", "Suburb", "Urban", "Waterfront"];
pub const CONDITIONS: [&str; 4] = ["Excellent", "Fair", "Good", "Poor"];

/// Synthetic raw housing data with a known linear price structure.
pub fn raw_csv(rows: usize) -> String {
    let mut csv = String::from("price,sqft,bedrooms,bathrooms,location,year_built,condition\n");
    for i in 0..rows {
        let sqft = 800 + (i * 37) % 3000;
        let bedrooms = 1 + i % 5;
        let bathrooms = 1.0 + (i % 3) as f64 * 0.5;
        let location = i % LOCATIONS.len();
        let condition = i % CONDITIONS.len();
        let year_built = 1950 + (i * 7) % 70;
        let price = 50_000
            + sqft * 150
            + bedrooms * 5_000
            + location * 20_000
            + (CONDITIONS.len() - condition) * 10_000;
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            price, sqft, bedrooms, bathrooms, LOCATIONS[location], year_built, CONDITIONS[condition]
        ));
    }
    csv
}

pub fn training_table(rows: usize) -> RawTable {
    RawTable::from_reader(raw_csv(rows).as_bytes()).unwrap()
}

pub fn ridge_config() -> TrainingConfig {
    TrainingConfig {
        cv: 3,
        model: ModelSection {
            best_model: "Ridge".to_string(),
            ..ModelSection::default()
        },
        ..TrainingConfig::default()
    }
}

pub fn small_forest_config() -> TrainingConfig {
    TrainingConfig {
        cv: 2,
        model: ModelSection {
            parameters: ModelParameters {
                n_estimators: Some(10),
                max_depth: Some(6),
                ..Default::default()
            },
            ..ModelSection::default()
        },
        ..TrainingConfig::default()
    }
}

/// Artifact store holding a freshly trained model.
pub fn trained_store(config: &TrainingConfig) -> InMemoryArtifactStore {
    let store = InMemoryArtifactStore::new();
    train_and_export(
        &training_table(120),
        config,
        2024,
        &store,
        &ArtifactKeys::default(),
        None,
    )
    .unwrap();
    store
}

pub fn sample_request() -> PredictionRequest {
    PredictionRequest {
        sqft: 1500.0,
        bedrooms: 3,
        bathrooms: 2.0,
        location: "Urban".to_string(),
        year_built: 2000,
        condition: "Good".to_string(),
        total_rooms: None,
    }
}
