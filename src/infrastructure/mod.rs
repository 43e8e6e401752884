pub mod observability;
pub mod repositories;
pub mod tracking;

pub use repositories::{FsArtifactStore, InMemoryArtifactStore};
pub use tracking::FileExperimentTracker;
