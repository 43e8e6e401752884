//! In-Memory Artifact Store
//!
//! Thread-safe map of artifact key to bytes. Used by tests and by callers
//! that build a model in-process.

use crate::domain::errors::ModelLoadError;
use crate::domain::repositories::ArtifactStore;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub struct InMemoryArtifactStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        match self.blobs.read() {
            Ok(blobs) => {
                let mut keys: Vec<String> = blobs.keys().cloned().collect();
                keys.sort();
                keys
            }
            Err(_) => Vec::new(),
        }
    }
}

impl Default for InMemoryArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, ModelLoadError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|e| ModelLoadError::ArtifactUnreadable {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| ModelLoadError::ArtifactMissing {
                key: key.to_string(),
            })
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| anyhow!("Artifact store lock poisoned: {}", e))?;
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
