//! File-backed experiment tracking
//!
//! Layout: `<root>/<experiment>/<run_id>/run.json` plus an `artifacts/`
//! directory holding copies of everything the run produced.

use crate::domain::repositories::{ExperimentRun, ExperimentTracker};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::info;

pub struct FileExperimentTracker {
    root: PathBuf,
}

impl FileExperimentTracker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Loads every run recorded for `experiment`, oldest first.
    pub fn runs(&self, experiment: &str) -> Result<Vec<ExperimentRun>> {
        let dir = self.root.join(experiment);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("Failed to list {:?}", dir))? {
            let run_file = entry?.path().join("run.json");
            if !run_file.exists() {
                continue;
            }
            let content = fs::read_to_string(&run_file)
                .with_context(|| format!("Failed to read {:?}", run_file))?;
            let run: ExperimentRun = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {:?}", run_file))?;
            runs.push(run);
        }
        runs.sort_by_key(|r| r.started_at);
        Ok(runs)
    }
}

impl ExperimentTracker for FileExperimentTracker {
    fn record(&self, run: &ExperimentRun, artifacts: &[(&str, &[u8])]) -> Result<PathBuf> {
        let run_dir = self.root.join(&run.experiment).join(&run.run_id);
        let artifact_dir = run_dir.join("artifacts");
        fs::create_dir_all(&artifact_dir)
            .with_context(|| format!("Failed to create run directory {:?}", run_dir))?;

        let mut recorded = run.clone();
        for (name, bytes) in artifacts {
            fs::write(artifact_dir.join(name), bytes)
                .with_context(|| format!("Failed to copy artifact {}", name))?;
            recorded.artifacts.push((*name).to_string());
        }

        let content =
            serde_json::to_string_pretty(&recorded).context("Failed to serialize run")?;
        fs::write(run_dir.join("run.json"), content).context("Failed to write run.json")?;

        info!(
            "Recorded run {} of experiment {} at {:?}",
            run.run_id, run.experiment, run_dir
        );
        Ok(run_dir)
    }
}
