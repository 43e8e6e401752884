pub mod experiment_tracker;

pub use experiment_tracker::FileExperimentTracker;
