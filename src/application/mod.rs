// Model loading and scoring
pub mod ml;

// Request orchestration for single and batch predictions
pub mod prediction_service;

// Offline data cleaning, feature engineering and training
pub mod training;
