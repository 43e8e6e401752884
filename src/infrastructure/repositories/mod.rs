pub mod fs_artifact_store;
pub mod in_memory;

pub use fs_artifact_store::FsArtifactStore;
pub use in_memory::InMemoryArtifactStore;
