//! Filesystem artifact store
//!
//! Each key maps to a file under the store's root directory. Writes go to a
//! temp file first and are renamed into place so a reader never sees a
//! half-written pipeline.

use crate::domain::errors::ModelLoadError;
use crate::domain::repositories::ArtifactStore;
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, ModelLoadError> {
        let path = self.path_for(key);
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ModelLoadError::ArtifactMissing {
                key: path.display().to_string(),
            },
            _ => ModelLoadError::ArtifactUnreadable {
                key: path.display().to_string(),
                reason: e.to_string(),
            },
        })
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)
                .with_context(|| format!("Failed to create artifact directory {:?}", self.root))?;
        }

        let path = self.path_for(key);
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, bytes)
            .with_context(|| format!("Failed to write temp artifact {:?}", temp_path))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to rename artifact into {:?}", path))?;

        debug!("Wrote {} bytes to {:?}", bytes.len(), path);
        Ok(())
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path().join("trained"));

        store.put("feature_names.json", b"[\"sqft\"]").unwrap();
        assert_eq!(store.get("feature_names.json").unwrap(), b"[\"sqft\"]");
        assert!(!store.path_for("feature_names.tmp").exists());
    }

    #[test]
    fn test_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let err = store.get("model_pipeline.json").unwrap_err();
        assert!(matches!(err, ModelLoadError::ArtifactMissing { .. }));
    }
}
