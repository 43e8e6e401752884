//! Offline stages: cleaning, feature engineering and model training.

pub mod feature_engineering;
pub mod table;
pub mod trainer;

pub use feature_engineering::{engineer_dataset, engineer_features};
pub use table::{CleaningReport, RawTable, clean, process_dataset};
pub use trainer::{TrainingConfig, TrainingOutcome, train, train_and_export};
