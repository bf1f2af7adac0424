// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Gradient accumulation, warmup schedule and the per-epoch
// orchestration of dev evaluation and checkpointing.
//
// Per batch (train_step):
//   loss = compute_loss(batch)          teacher forcing
//   grads = backward(loss / K)          scaled so K batches ≈ one big batch
//   accumulator += grads
//   every K-th batch:
//     θ ← optimiser.step(lr, θ, accumulated)
//     step += 1
//     lr ← noam(step)                   used by the NEXT optimiser step
//
// Gradients left in the accumulator at the end of an epoch are
// carried into the next one; the sub-step counter is not reset.
//
// Per epoch (run_epochs):
//   train → dev loss → decode dev batches → BLEU (smoothing 1)
//   → plateau scheduler → checkpoint → results.txt
//
// Key Burn insight:
//   - Training uses B = Autodiff<...> for gradients
//   - model.valid() returns the model on B::InnerBackend with
//     dropout off; dev batches are built on that backend too
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam
//            Ott et al. (2018) Scaling NMT (delayed updates)

use anyhow::{ensure, Result};
use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::marker::PhantomData;

use crate::data::batcher::TranslationBatch;
use crate::domain::bleu::eval_bleu;
use crate::infra::checkpoint::{
    record_from_bytes, record_to_bytes, Checkpoint, CheckpointManager, OptimizerSnapshot,
};
use crate::infra::metrics::{EpochMetrics, ResultsLog};
use crate::infra::vocabulary::Vocabulary;
use crate::ml::evaluator::eval_loss;
use crate::ml::loss::{compute_loss, Criterion};
use crate::ml::schedule::{ReduceOnPlateau, WarmupSchedule};
use crate::ml::seq2seq::Seq2Seq;
use crate::ml::translator::{decode_outputs, print_seqs, DecodeSettings};

// ─── TrainingState ────────────────────────────────────────────────────────────
/// Everything that changes while training: parameters, optimiser
/// state, pending gradients, the global step and the current lr.
pub struct TrainingState<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    pub model:   M,
    pub optim:   O,
    accumulator: GradientsAccumulator<M>,
    /// Batches accumulated since the last optimiser step
    pub pending: usize,
    /// Optimiser steps taken over the whole run
    pub step:    usize,
    /// Learning rate the next optimiser step will use
    pub lr:      f64,
    _backend:    PhantomData<B>,
}

impl<B, M, O> TrainingState<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    pub fn new(model: M, optim: O, initial_lr: f64) -> Self {
        Self {
            model,
            optim,
            accumulator: GradientsAccumulator::new(),
            pending: 0,
            step: 0,
            lr: initial_lr,
            _backend: PhantomData,
        }
    }

    /// Checkpoint record for the end of `epoch`.
    pub fn snapshot(&self, epoch: usize, dev_loss: f64, dev_bleu: f64) -> Result<Checkpoint> {
        Ok(Checkpoint {
            epoch,
            dev_loss,
            dev_bleu,
            model: record_to_bytes::<B, _>(self.model.clone().into_record())?,
            optimizer: OptimizerSnapshot {
                global_step: self.step,
                lr:          self.lr,
                state:       record_to_bytes::<B, _>(self.optim.to_record())?,
            },
        })
    }

    /// Load parameters, optimiser state and schedule position from a checkpoint.
    /// Pending gradients are not part of a checkpoint and start empty.
    pub fn restore(self, checkpoint: Checkpoint, device: &B::Device) -> Result<Self> {
        let model_record =
            record_from_bytes::<B, <M as Module<B>>::Record>(checkpoint.model, device)?;
        let optim_record =
            record_from_bytes::<B, <O as Optimizer<M, B>>::Record>(checkpoint.optimizer.state, device)?;

        Ok(Self {
            model:       self.model.load_record(model_record),
            optim:       self.optim.load_record(optim_record),
            accumulator: GradientsAccumulator::new(),
            pending:     0,
            step:        checkpoint.optimizer.global_step,
            lr:          checkpoint.optimizer.lr,
            _backend:    PhantomData,
        })
    }
}

// ─── Settings ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TrainerSettings {
    pub start_epoch:      usize,
    pub n_epochs:         usize,
    /// Batches per optimiser step (K)
    pub accum_steps:      usize,
    pub schedule:         WarmupSchedule,
    /// Log the running training loss every this many batches (0 = never)
    pub report_freq:      usize,
    pub smoothing_method: usize,
    /// Ref/hyp pairs logged after each dev decode
    pub print_seqs:       usize,
    pub decode:           DecodeSettings,
}

// ─── One batch ────────────────────────────────────────────────────────────────
/// Forward, scaled backward and accumulation for one prepared batch;
/// steps the optimiser every `accum_steps` batches. Returns the
/// unscaled loss.
pub fn train_step<B, M, O, C>(
    state:     &mut TrainingState<B, M, O>,
    batch:     &TranslationBatch<B>,
    criterion: &C,
    settings:  &TrainerSettings,
) -> Result<f64>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Seq2Seq<B>,
    O: Optimizer<M, B>,
    C: Criterion<B>,
{
    let accum_steps = settings.accum_steps;
    ensure!(accum_steps > 0, "Gradient accumulation needs at least one batch per step");

    let loss = compute_loss(&state.model, criterion, batch);
    let loss_value: f64 = loss.clone().into_scalar().elem();

    let grads = loss.div_scalar(accum_steps as f64).backward();
    let grads = GradientsParams::from_grads(grads, &state.model);
    state.accumulator.accumulate(&state.model, grads);
    state.pending += 1;

    if state.pending == accum_steps {
        let grads = state.accumulator.grads();
        state.model   = state.optim.step(state.lr, state.model.clone(), grads);
        state.pending = 0;
        state.step   += 1;
        state.lr      = settings.schedule.lr(state.step)?;
    }

    Ok(loss_value)
}

// ─── One epoch ────────────────────────────────────────────────────────────────
/// Train over every batch once. Returns the mean unscaled loss (NaN if empty).
pub fn train_epoch<B, M, O, C>(
    state:     &mut TrainingState<B, M, O>,
    loader:    &dyn DataLoader<TranslationBatch<B>>,
    criterion: &C,
    settings:  &TrainerSettings,
    epoch:     usize,
    device:    &B::Device,
) -> Result<f64>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Seq2Seq<B>,
    O: Optimizer<M, B>,
    C: Criterion<B>,
{
    let mut loss_sum   = 0.0f64;
    let mut batches    = 0usize;
    let mut report_sum = 0.0f64;
    let mut report_n   = 0usize;

    for batch in loader.iter() {
        let batch = batch.prepare(device);
        let loss  = train_step(state, &batch, criterion, settings)?;

        loss_sum   += loss;
        batches    += 1;
        report_sum += loss;
        report_n   += 1;

        if settings.report_freq > 0 && batches % settings.report_freq == 0 {
            tracing::info!(
                "epoch {} | batch {:>6} | loss {:.4} | lr {:.3e} | step {}",
                epoch,
                batches,
                report_sum / report_n as f64,
                state.lr,
                state.step,
            );
            report_sum = 0.0;
            report_n   = 0;
        }
    }

    Ok(if batches > 0 { loss_sum / batches as f64 } else { f64::NAN })
}

// ─── Epoch orchestrator ───────────────────────────────────────────────────────
/// Run epochs `start_epoch ..= n_epochs`: train, evaluate on dev,
/// checkpoint and log each one. Returns the final state.
#[allow(clippy::too_many_arguments)]
pub fn run_epochs<B, M, O, C>(
    mut state:    TrainingState<B, M, O>,
    criterion:    &C,
    train_loader: &dyn DataLoader<TranslationBatch<B>>,
    dev_loader:   &dyn DataLoader<TranslationBatch<B::InnerBackend>>,
    vocab:        &Vocabulary,
    mut plateau:  Option<ReduceOnPlateau>,
    checkpoints:  &CheckpointManager,
    settings:     &TrainerSettings,
    device:       &B::Device,
) -> Result<TrainingState<B, M, O>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Seq2Seq<B>,
    M::InnerModule: Seq2Seq<B::InnerBackend>,
    O: Optimizer<M, B>,
    C: Criterion<B> + Criterion<B::InnerBackend>,
{
    let results = ResultsLog::new(checkpoints.dir(), settings.start_epoch)?;

    tracing::info!(
        "Training epochs {}..={} (K={}, global step {}, lr {:.3e})",
        settings.start_epoch,
        settings.n_epochs,
        settings.accum_steps,
        state.step,
        state.lr,
    );

    for epoch in settings.start_epoch..=settings.n_epochs {
        tracing::info!("Epoch {} started", epoch);

        // ── Training phase ────────────────────────────────────────────────────
        let train_loss = train_epoch(&mut state, train_loader, criterion, settings, epoch, device)?;

        // ── Dev phase (inference copy: dropout off, no autodiff) ──────────────
        let model_valid = state.model.valid();
        let dev_loss    = eval_loss(&model_valid, criterion, dev_loader, device);

        let (hyps, refs) = decode_outputs(&model_valid, dev_loader, vocab, &settings.decode, device)?;
        let dev_bleu = if hyps.is_empty() {
            f64::NAN
        } else {
            eval_bleu(&hyps, &refs, settings.smoothing_method)?
        };
        tracing::info!("Dev BLEU {:.2} over {} sequences", dev_bleu, hyps.len());
        print_seqs(&hyps, &refs, settings.print_seqs, settings.decode.seed);

        if let Some(plateau) = plateau.as_mut() {
            state.lr = plateau.step(dev_loss, state.lr);
        }

        // ── Persist ───────────────────────────────────────────────────────────
        checkpoints.save(&state.snapshot(epoch, dev_loss, dev_bleu)?)?;
        results.append(&EpochMetrics::new(epoch, dev_loss, dev_bleu))?;

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | dev_loss={:.4} | dev_bleu={:.2} | step={} | lr={:.3e}",
            epoch, settings.n_epochs, train_loss, dev_loss, dev_bleu, state.step, state.lr,
        );
    }

    tracing::info!("Training complete!");
    Ok(state)
}
