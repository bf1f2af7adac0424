// ============================================================
// Layer 2 — TranslateUseCase
// ============================================================
// Loads a trained run from its save directory and translates
// new sentences:
//
//   1. train_config.json → rebuild the model architecture
//   2. vocab.json        → the same ids as training
//   3. checkpoint_*.bin  → parameters (latest unless given)
//   4. clean, encode, batch, greedy / beam decode, detokenise
//
// Inference runs on the plain backend: no autodiff graph and
// dropout is inactive.

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    data::dataloader::DataLoaderBuilder,
    prelude::*,
};
use std::path::PathBuf;

use crate::application::train_use_case::DeviceKind;
use crate::data::{
    batcher::TranslationBatcher,
    dataset::{TranslationDataset, TranslationSample},
    preprocessor::Preprocessor,
};
use crate::infra::{
    checkpoint::{record_from_bytes, CheckpointManager},
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    model::TranslationModel,
    translator::{decode_outputs, BatchSelection, DecodeSettings},
};

pub struct TranslateUseCase {
    save_dir:   String,
    checkpoint: Option<PathBuf>,
    beam:       usize,
    batch_size: usize,
    unsplit:    bool,
    device:     DeviceKind,
}

impl TranslateUseCase {
    pub fn new(
        save_dir:   String,
        checkpoint: Option<PathBuf>,
        beam:       usize,
        batch_size: usize,
        unsplit:    bool,
        device:     DeviceKind,
    ) -> Self {
        Self { save_dir, checkpoint, beam, batch_size: batch_size.max(1), unsplit, device }
    }

    /// Translate each input line, in order.
    pub fn translate(&self, lines: &[String]) -> Result<Vec<String>> {
        match self.device {
            DeviceKind::Cpu         => self.run::<NdArray>(NdArrayDevice::default(), lines),
            DeviceKind::Accelerator => self.run::<Wgpu>(WgpuDevice::default(), lines),
        }
    }

    fn run<B: Backend>(&self, device: B::Device, lines: &[String]) -> Result<Vec<String>> {
        let checkpoints = CheckpointManager::new(&self.save_dir)?;
        let cfg   = checkpoints.load_config()?;
        let vocab = TokenizerStore::new(&self.save_dir).load()?;

        let path = match &self.checkpoint {
            Some(path) => path.clone(),
            None => checkpoints
                .latest()?
                .with_context(|| format!("No checkpoint found in '{}'", self.save_dir))?,
        };
        let checkpoint = checkpoints.load(&path)?;

        let model: TranslationModel<B> = cfg.model_config(vocab.len()).init(&device);
        let record = record_from_bytes::<B, <TranslationModel<B> as Module<B>>::Record>(
            checkpoint.model,
            &device,
        )?;
        let model = model.load_record(record);

        let preprocessor = Preprocessor::new();
        let samples = lines
            .iter()
            .map(|line| {
                let ids = vocab.encode_with_sentinels(&preprocessor.clean(line), cfg.max_len)?;
                Ok(TranslationSample::new(ids.clone(), ids))
            })
            .collect::<Result<Vec<_>>>()?;

        let loader = DataLoaderBuilder::new(TranslationBatcher::<B>::new(device.clone(), cfg.max_len))
            .batch_size(self.batch_size)
            .build(TranslationDataset::new(samples));

        let settings = DecodeSettings {
            beam:       self.beam,
            max_len:    cfg.max_len,
            unsplit:    self.unsplit,
            batch_size: self.batch_size,
            selection:  BatchSelection::All,
            seed:       None,
        };
        let (hyps, _) = decode_outputs(&model, loader.as_ref(), &vocab, &settings, &device)?;
        tracing::info!("Translated {} sentences with epoch {} weights", hyps.len(), checkpoint.epoch);
        Ok(hyps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::infra::vocabulary::Vocabulary;
    use crate::ml::trainer::TrainingState;
    use burn::backend::Autodiff;
    use burn::optim::AdamConfig;

    #[test]
    fn test_translates_every_line_from_saved_run() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            save_dir:           dir.path().display().to_string(),
            max_len:            8,
            d_model:            16,
            num_heads:          2,
            num_encoder_layers: 1,
            num_decoder_layers: 1,
            d_ff:               32,
            ..TrainConfig::default()
        };
        let vocab = Vocabulary::from_words(&["a", "b", "c"]).unwrap();
        TokenizerStore::new(dir.path()).save(&vocab).unwrap();

        let checkpoints = CheckpointManager::new(dir.path()).unwrap();
        checkpoints.save_config(&cfg).unwrap();

        let device = Default::default();
        let model  = cfg.model_config(vocab.len()).init::<Autodiff<NdArray>>(&device);
        let state  = TrainingState::new(model, AdamConfig::new().init(), 1e-3);
        checkpoints.save(&state.snapshot(1, 2.0, 0.0).unwrap()).unwrap();

        let lines = vec!["a b".to_string(), "c".to_string(), "b a c".to_string()];
        for beam in [1, 2] {
            let use_case = TranslateUseCase::new(
                cfg.save_dir.clone(), None, beam, 2, false, DeviceKind::Cpu,
            );
            assert_eq!(use_case.translate(&lines).unwrap().len(), lines.len());
        }
    }
}
