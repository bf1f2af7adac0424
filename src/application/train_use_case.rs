// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the parallel corpus   (Layer 4 - data)
//   Step 2: Dev set: files or split    (Layer 4 - data)
//   Step 3: Build / load vocabulary    (Layer 6 - infra)
//   Step 4: Encode datasets            (Layer 4 - data)
//   Step 5: Save config                (Layer 6 - infra)
//   Step 6: Build model + optimiser    (Layer 5 - ml)
//   Step 7: Resume from checkpoint     (Layer 6 - infra)
//   Step 8: Run the epoch loop         (Layer 5 - ml)
//
// The backend is picked once from DeviceKind; everything
// below `run` is generic over it.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{ensure, Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    data::dataloader::DataLoaderBuilder,
    optim::AdamConfig,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::TranslationBatcher,
    dataset::TranslationDataset,
    loader::ParallelCorpusLoader,
    splitter::split_train_dev,
};
use crate::domain::traits::CorpusSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer_store::TokenizerStore,
    vocabulary::PAD_ID,
};
use crate::ml::{
    loss::MaskedCrossEntropy,
    model::TranslationModelConfig,
    schedule::{ReduceOnPlateau, WarmupSchedule, WARMUP_STEPS},
    trainer::{run_epochs, TrainerSettings, TrainingState},
    translator::{BatchSelection, DecodeSettings},
};

// ─── Device ───────────────────────────────────────────────────────────────────
/// Compute device, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceKind {
    /// burn NdArray backend
    #[default]
    Cpu,
    /// burn Wgpu backend (GPU through wgpu)
    Accelerator,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the checkpoints so resume and translate can
// rebuild exactly the same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_src:          String,
    pub train_tgt:          String,
    pub dev_src:            Option<String>,
    pub dev_tgt:            Option<String>,
    pub save_dir:           String,

    pub vocab_size:         usize,
    pub max_len:            usize,
    pub d_model:            usize,
    pub num_heads:          usize,
    pub num_encoder_layers: usize,
    pub num_decoder_layers: usize,
    pub d_ff:               usize,
    pub dropout:            f64,

    pub batch_size:         usize,
    pub n_epochs:           usize,
    /// Learning rate of the very first optimiser step; None uses the warmup value at step 1
    pub lr:                 Option<f64>,
    pub accum_steps:        usize,
    pub warmup_steps:       usize,
    pub plateau_factor:     Option<f64>,
    pub plateau_patience:   usize,
    pub min_lr:             f64,

    pub beam:               usize,
    /// Dev batches decoded per epoch; negative decodes all of them
    pub decode_batches:     isize,
    pub smoothing_method:   usize,
    pub unsplit:            bool,
    pub print_seqs:         usize,
    pub report_freq:        usize,

    /// Share of the training corpus held out when no dev files are given
    pub dev_fraction:       f64,
    pub seed:               u64,
    pub num_workers:        usize,
    pub resume:             bool,
    pub device:             DeviceKind,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_src:          "data/train.src".to_string(),
            train_tgt:          "data/train.tgt".to_string(),
            dev_src:            None,
            dev_tgt:            None,
            save_dir:           "checkpoints".to_string(),

            vocab_size:         32000,
            max_len:            100,
            d_model:            512,
            num_heads:          8,
            num_encoder_layers: 6,
            num_decoder_layers: 6,
            d_ff:               2048,
            dropout:            0.1,

            batch_size:         32,
            n_epochs:           10,
            lr:                 None,
            accum_steps:        4,
            warmup_steps:       WARMUP_STEPS,
            plateau_factor:     None,
            plateau_patience:   2,
            min_lr:             1e-6,

            beam:               1,
            decode_batches:     5,
            smoothing_method:   1,
            unsplit:            false,
            print_seqs:         3,
            report_freq:        100,

            dev_fraction:       0.1,
            seed:               42,
            num_workers:        1,
            resume:             false,
            device:             DeviceKind::Cpu,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self, vocab_size: usize) -> TranslationModelConfig {
        TranslationModelConfig::new(
            vocab_size,
            self.max_len,
            self.d_model,
            self.num_heads,
            self.num_encoder_layers,
            self.num_decoder_layers,
            self.d_ff,
            self.dropout,
        )
    }

    pub fn schedule(&self) -> WarmupSchedule {
        WarmupSchedule::new(self.d_model, self.warmup_steps)
    }

    pub fn decode_settings(&self) -> DecodeSettings {
        DecodeSettings {
            beam:       self.beam,
            max_len:    self.max_len,
            unsplit:    self.unsplit,
            batch_size: self.batch_size,
            selection:  BatchSelection::from_count(self.decode_batches),
            seed:       Some(self.seed),
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be positive");
        ensure!(self.accum_steps > 0, "accum_steps must be positive");
        ensure!(self.n_epochs > 0, "n_epochs must be positive");
        ensure!(self.num_heads > 0, "num_heads must be positive");
        ensure!(self.max_len >= 2, "max_len must leave room for <s> and </s>");
        ensure!(
            self.d_model % self.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model,
            self.num_heads
        );
        ensure!(
            self.dev_fraction > 0.0 && self.dev_fraction < 1.0,
            "dev_fraction must lie strictly between 0 and 1"
        );
        ensure!(
            self.dev_src.is_some() == self.dev_tgt.is_some(),
            "dev_src and dev_tgt must be given together"
        );
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Pick the backend and run training end to end.
    pub fn execute(&self) -> Result<()> {
        self.config.validate()?;
        match self.config.device {
            DeviceKind::Cpu => {
                tracing::info!("Using the CPU backend (ndarray)");
                self.run::<Autodiff<NdArray>>(NdArrayDevice::default())
            }
            DeviceKind::Accelerator => {
                tracing::info!("Using the accelerator backend (wgpu)");
                self.run::<Autodiff<Wgpu>>(WgpuDevice::default())
            }
        }
    }

    fn run<B: AutodiffBackend>(&self, device: B::Device) -> Result<()> {
        let cfg = self.effective_config()?;

        // ── Step 1: Load the training corpus ──────────────────────────────────
        tracing::info!("Loading training corpus '{}' / '{}'", cfg.train_src, cfg.train_tgt);
        let pairs = ParallelCorpusLoader::new(&cfg.train_src, &cfg.train_tgt).load_pairs()?;
        ensure!(!pairs.is_empty(), "Training corpus '{}' has no usable pairs", cfg.train_src);

        // ── Step 2: Dev set ───────────────────────────────────────────────────
        let (train_pairs, dev_pairs) = match (&cfg.dev_src, &cfg.dev_tgt) {
            (Some(src), Some(tgt)) => {
                tracing::info!("Loading dev corpus '{}' / '{}'", src, tgt);
                (pairs, ParallelCorpusLoader::new(src, tgt).load_pairs()?)
            }
            _ => split_train_dev(pairs, 1.0 - cfg.dev_fraction, cfg.seed),
        };
        tracing::info!("Split: {} train, {} dev", train_pairs.len(), dev_pairs.len());

        // ── Step 3: Vocabulary (joint source + target) ────────────────────────
        // A fresh run never reuses ids from an earlier run in the same dir
        let store     = TokenizerStore::new(&cfg.save_dir);
        let sentences = train_pairs
            .iter()
            .flat_map(|p| [p.source.as_str(), p.target.as_str()]);
        let vocab = if cfg.resume {
            store.load_or_build(sentences, cfg.vocab_size)?
        } else {
            store.rebuild(sentences, cfg.vocab_size)?
        };

        // ── Step 4: Encode ────────────────────────────────────────────────────
        let train_dataset = TranslationDataset::from_pairs(&train_pairs, &vocab, cfg.max_len)?;
        let dev_dataset   = TranslationDataset::from_pairs(&dev_pairs, &vocab, cfg.max_len)?;
        tracing::info!(
            "Encoded {} train / {} dev samples (vocabulary {})",
            train_dataset.sample_count(),
            dev_dataset.sample_count(),
            vocab.len()
        );

        // ── Step 5: Save config ───────────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.save_dir)?;
        if !cfg.resume {
            checkpoints.save_config(&cfg)?;
        }

        // ── Step 6: Model + optimiser ─────────────────────────────────────────
        let model_config = cfg.model_config(vocab.len());
        let model = model_config.init::<B>(&device);
        let optim = AdamConfig::new()
            .with_beta_1(0.9)
            .with_beta_2(0.98)
            .with_epsilon(1e-9)
            .init();
        let schedule   = cfg.schedule();
        let initial_lr = match cfg.lr {
            Some(lr) => lr,
            None => schedule.lr(1)?,
        };
        let mut state = TrainingState::new(model, optim, initial_lr);

        // ── Step 7: Resume ────────────────────────────────────────────────────
        let mut start_epoch = 1;
        if cfg.resume {
            if let Some(path) = checkpoints.latest()? {
                let checkpoint = checkpoints.load(&path)?;
                start_epoch = checkpoint.epoch + 1;
                tracing::info!(
                    "Resuming from '{}' (epoch {}, step {})",
                    path.display(),
                    checkpoint.epoch,
                    checkpoint.optimizer.global_step
                );
                state = state.restore(checkpoint, &device)?;
            } else {
                tracing::warn!("No checkpoint in '{}'; starting from scratch", cfg.save_dir);
            }
        }
        if start_epoch > cfg.n_epochs {
            tracing::info!("All {} epochs already trained", cfg.n_epochs);
            return Ok(());
        }

        // ── Step 8: Epoch loop ────────────────────────────────────────────────
        let train_loader = DataLoaderBuilder::new(TranslationBatcher::<B>::new(device.clone(), cfg.max_len))
            .batch_size(cfg.batch_size)
            .shuffle(cfg.seed)
            .num_workers(cfg.num_workers)
            .build(train_dataset);
        let dev_loader = DataLoaderBuilder::new(TranslationBatcher::<B::InnerBackend>::new(
            device.clone(),
            cfg.max_len,
        ))
        .batch_size(cfg.batch_size)
        .build(dev_dataset);

        let settings = TrainerSettings {
            start_epoch,
            n_epochs:         cfg.n_epochs,
            accum_steps:      cfg.accum_steps,
            schedule,
            report_freq:      cfg.report_freq,
            smoothing_method: cfg.smoothing_method,
            print_seqs:       cfg.print_seqs,
            decode:           cfg.decode_settings(),
        };
        let plateau = cfg
            .plateau_factor
            .map(|factor| ReduceOnPlateau::new(factor, cfg.plateau_patience, cfg.min_lr));

        run_epochs(
            state,
            &MaskedCrossEntropy::new(PAD_ID as usize),
            train_loader.as_ref(),
            dev_loader.as_ref(),
            &vocab,
            plateau,
            &checkpoints,
            &settings,
            &device,
        )?;

        Ok(())
    }

    /// On resume the saved architecture and corpus settings win;
    /// only the epoch count and device come from the command line.
    fn effective_config(&self) -> Result<TrainConfig> {
        if !self.config.resume {
            return Ok(self.config.clone());
        }
        let saved = CheckpointManager::new(&self.config.save_dir)?
            .load_config()
            .context("Cannot resume without the saved training config")?;
        Ok(TrainConfig {
            n_epochs: self.config.n_epochs,
            device:   self.config.device,
            resume:   true,
            ..saved
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_setup() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.accum_steps, 4);
        assert_eq!(cfg.warmup_steps, 4000);
        assert_eq!(cfg.beam, 1);
        assert_eq!(cfg.max_len, 100);
        assert_eq!(cfg.decode_batches, 5);
        assert_eq!(cfg.smoothing_method, 1);
        assert_eq!(cfg.batch_size, 32);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_negative_decode_batches_selects_all() {
        let cfg = TrainConfig { decode_batches: -1, ..TrainConfig::default() };
        assert_eq!(cfg.decode_settings().selection, BatchSelection::All);
    }

    #[test]
    fn test_rejects_half_dev_pair() {
        let cfg = TrainConfig { dev_src: Some("dev.src".into()), ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_indivisible_heads() {
        let cfg = TrainConfig { d_model: 100, num_heads: 8, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_trains_two_epochs_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("train.src");
        let tgt = dir.path().join("train.tgt");
        let lines: Vec<String> = (0..8).map(|i| format!("w{} w{}", i % 3, i % 5)).collect();
        std::fs::write(&src, lines.join("\n")).unwrap();
        std::fs::write(&tgt, lines.join("\n")).unwrap();

        let save_dir = dir.path().join("run");
        let cfg = TrainConfig {
            train_src:          src.display().to_string(),
            train_tgt:          tgt.display().to_string(),
            save_dir:           save_dir.display().to_string(),
            max_len:            8,
            d_model:            16,
            num_heads:          2,
            num_encoder_layers: 1,
            num_decoder_layers: 1,
            d_ff:               32,
            batch_size:         2,
            n_epochs:           2,
            accum_steps:        2,
            dev_fraction:       0.25,
            num_workers:        1,
            ..TrainConfig::default()
        };
        TrainUseCase::new(cfg).execute().unwrap();

        let saved = CheckpointManager::new(&save_dir).unwrap().list().unwrap();
        assert_eq!(saved.len(), 2);
        assert!(save_dir.join("vocab.json").exists());
        assert!(save_dir.join("train_config.json").exists());
        let results = std::fs::read_to_string(save_dir.join("results.txt")).unwrap();
        assert_eq!(results.lines().count(), 3);
    }
}
