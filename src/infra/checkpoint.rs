// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// One immutable checkpoint per epoch, plus the run config.
//
// What gets saved per checkpoint:
//   1. epoch, dev loss, dev BLEU
//   2. model parameters   (burn record, BinBytesRecorder)
//   3. optimiser snapshot (burn record + global step + current lr)
//
// The burn records are encoded to bytes with BinBytesRecorder
// and wrapped with the metadata in one serde struct written
// with bincode. Burn's file recorders replace everything after
// the last '.' with their own extension, which would eat the
// BLEU digits of the file name.
//
// File naming convention:
//   <save_dir>/
//     checkpoint_1_12.3456.bin    ← epoch 1, dev BLEU 12.3456
//     checkpoint_2_NaN.bin        ← epoch 2, BLEU not evaluated
//     train_config.json           ← run configuration
//
// A checkpoint file is created with create_new: an existing file
// is never overwritten and a failed write aborts the run.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Record, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;

const CONFIG_FILE: &str = "train_config.json";

type BytesRecorder = BinBytesRecorder<FullPrecisionSettings>;

/// Optimiser state plus the schedule position it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerSnapshot {
    pub global_step: usize,
    pub lr:          f64,
    pub state:       Vec<u8>,
}

/// Everything written for one epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch:     usize,
    pub dev_loss:  f64,
    pub dev_bleu:  f64,
    pub model:     Vec<u8>,
    pub optimizer: OptimizerSnapshot,
}

/// Encode any burn record (model or optimiser) to bytes.
pub fn record_to_bytes<B: Backend, R: Record<B>>(record: R) -> Result<Vec<u8>> {
    <BytesRecorder as Recorder<B>>::record(&BytesRecorder::default(), record, ())
        .map_err(|e| anyhow::anyhow!("Cannot encode record: {e:?}"))
}

/// Decode a burn record produced by `record_to_bytes`.
pub fn record_from_bytes<B: Backend, R: Record<B>>(bytes: Vec<u8>, device: &B::Device) -> Result<R> {
    <BytesRecorder as Recorder<B>>::load(&BytesRecorder::default(), bytes, device)
        .map_err(|e| anyhow::anyhow!("Cannot decode record: {e:?}"))
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create save dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn checkpoint_path(&self, epoch: usize, dev_bleu: f64) -> PathBuf {
        self.dir.join(format!("checkpoint_{epoch}_{dev_bleu:.4}.bin"))
    }

    /// Write one checkpoint. Fails if the file already exists.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<PathBuf> {
        let path = self.checkpoint_path(checkpoint.epoch, checkpoint.dev_bleu);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("Cannot create checkpoint '{}'", path.display()))?;

        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, checkpoint)
            .with_context(|| format!("Failed to write checkpoint '{}'", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to write checkpoint '{}'", path.display()))?;

        tracing::info!("Saved checkpoint '{}'", path.display());
        Ok(path)
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<Checkpoint> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .with_context(|| format!("Cannot open checkpoint '{}'", path.display()))?;
        let checkpoint: Checkpoint = bincode::deserialize_from(BufReader::new(file))
            .with_context(|| format!("Corrupt checkpoint '{}'", path.display()))?;

        tracing::info!("Loaded checkpoint for epoch {} from '{}'", checkpoint.epoch, path.display());
        Ok(checkpoint)
    }

    /// Every checkpoint file in the directory, sorted by epoch.
    pub fn list(&self) -> Result<Vec<(usize, PathBuf)>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            let epoch = path
                .file_name()
                .and_then(|n| n.to_str())
                .filter(|n| n.ends_with(".bin"))
                .and_then(|n| n.strip_prefix("checkpoint_"))
                .and_then(|rest| rest.split('_').next())
                .and_then(|e| e.parse::<usize>().ok());
            if let Some(epoch) = epoch {
                found.push((epoch, path));
            }
        }
        found.sort();
        Ok(found)
    }

    /// Path of the highest-epoch checkpoint, if any.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.list()?.pop().map(|(_, path)| path))
    }

    /// Save the run configuration so translate/resume can rebuild the model.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}
