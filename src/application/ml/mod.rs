pub mod model_state;
pub mod pipeline;
pub mod predictor;
pub mod smartcore_predictor;

pub use model_state::ModelState;
pub use pipeline::{ModelPipeline, Regressor, StandardScaler};
pub use predictor::PricePredictor;
pub use smartcore_predictor::SmartCorePredictor;
