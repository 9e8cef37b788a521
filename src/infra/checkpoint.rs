// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Keeps the single best model of a trial on disk using Burn's
// CompactRecorder (MessagePack, half precision).
//
// File naming convention:
//   <ckpt_dir>/<model>-best_model_<trial>_<experiment>.mpk
//
// The model name has '/' replaced by '_' so hub identifiers do
// not create sub-directories. Each save overwrites the previous
// best; `remove` deletes the file once the trial is over.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{fs, path::PathBuf};

/// Extension CompactRecorder appends to the base path.
const RECORD_EXTENSION: &str = "mpk";

pub struct CheckpointManager {
    /// Base path without extension (the recorder adds it)
    base: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>, model_name: &str, trial: &str, experiment: &str) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;

        let file = format!("{}-best_model_{}_{}", model_name.replace('/', "_"), trial, experiment);
        Ok(Self { base: dir.join(file) })
    }

    /// Full path of the checkpoint file.
    pub fn path(&self) -> PathBuf {
        self.base.with_extension(RECORD_EXTENSION)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Overwrite the checkpoint with `model`.
    pub fn save_best<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize, score: f64) -> Result<()> {
        CompactRecorder::new()
            .record(model.clone().into_record(), self.base.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", self.path().display()))?;

        tracing::info!("New best model at epoch {} (score {:.4}) → '{}'", epoch, score, self.path().display());
        Ok(())
    }

    /// Load the saved weights into `model`.
    pub fn restore<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let record = CompactRecorder::new()
            .load(self.base.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", self.path().display()))?;

        tracing::debug!("Restored checkpoint '{}'", self.path().display());
        Ok(model.load_record(record))
    }

    /// Delete the checkpoint. A missing file is logged, never an error.
    pub fn remove(&self) {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => tracing::info!("Removed checkpoint '{}'", path.display()),
            Err(e) => tracing::warn!("Could not remove checkpoint '{}': {}", path.display(), e),
        }
    }
}
