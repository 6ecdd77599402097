// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores a Seq2SeqModel.
//
// What gets saved:
//   1. model_config.json - the Seq2SeqConfig (burn Config, JSON)
//   2. model.mpk.gz      - every parameter, via CompactRecorder
//
// Loading reads the config first, rebuilds a model with that
// architecture, then loads the weights into it. CompactRecorder
// stores half precision, so restored weights match to ~1e-3.
//
// Layout:
//   checkpoints/
//     model_config.json
//     model.mpk.gz
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{anyhow, Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::ml::seq2seq::{Seq2SeqConfig, Seq2SeqModel};

/// File name of the serialised Seq2SeqConfig
const CONFIG_FILE: &str = "model_config.json";
/// Weight file stem; CompactRecorder appends .mpk.gz
const MODEL_FILE:  &str = "model";

// ─── CheckpointManager ────────────────────────────────────────────────────────
/// Saves and loads one Seq2SeqModel checkpoint.
/// Both files live directly in the configured directory.
pub struct CheckpointManager {
    /// Directory holding model_config.json and model.mpk.gz
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a manager for `dir`.
    /// Nothing is touched on disk until the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write the model architecture to model_config.json.
    ///
    /// The decode workflow reads it back to rebuild a model of the
    /// same shape before loading any weights.
    pub fn save_config(&self, cfg: &Seq2SeqConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))?;

        let path = self.dir.join(CONFIG_FILE);
        cfg.save(&path)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    /// Read model_config.json.
    /// Returns an error pointing at `init` when there is none.
    pub fn load_config(&self) -> Result<Seq2SeqConfig> {
        let path = self.dir.join(CONFIG_FILE);
        Seq2SeqConfig::load(&path).map_err(|e| anyhow!(
            "Cannot read config from '{}': {e:?}. Run 'init' first.",
            path.display(),
        ))
    }

    /// Write the model weights.
    ///
    /// CompactRecorder:
    ///   1. takes model.into_record() with every parameter
    ///   2. stores it as half-precision MessagePack
    ///   3. gzips it to {dir}/model.mpk.gz
    pub fn save_model<B: Backend>(&self, model: &Seq2SeqModel<B>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))?;

        let path = self.dir.join(MODEL_FILE);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved model weights to '{}'", path.display());
        Ok(())
    }

    /// Save config and weights together.
    pub fn save<B: Backend>(&self, cfg: &Seq2SeqConfig, model: &Seq2SeqModel<B>) -> Result<()> {
        self.save_config(cfg)?;
        self.save_model(model)
    }

    /// Rebuild the model from the stored config and load its weights.
    ///
    /// Steps:
    ///   1. Read model_config.json
    ///   2. Initialise a model with that architecture on `device`
    ///   3. Load model.mpk.gz and call load_record() on it
    pub fn load<B: Backend>(&self, device: &B::Device) -> Result<(Seq2SeqConfig, Seq2SeqModel<B>)> {
        let cfg   = self.load_config()?;
        let model = cfg.init::<B>(device);

        let path   = self.dir.join(MODEL_FILE);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!(
                "Cannot load checkpoint '{}'. Run 'init' first.", path.display(),
            ))?;

        tracing::info!("Loaded checkpoint from '{}'", self.dir.display());
        Ok((cfg, model.load_record(record)))
    }
}
