// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, runs or updates the network.
//
//   seq2seq.rs    — The encoder-decoder seam: forward pass with
//                   teacher forcing, greedy decode, beam search.
//                   The loop below only ever talks to this trait.
//
//   model.rs      — Transformer encoder-decoder implementing it
//                   (embeddings, post-norm blocks, generator).
//
//   loss.rs       — Pad-masked cross-entropy and the shift
//                   between decoder input and labels.
//
//   schedule.rs   — Noam warmup/decay and reduce-on-plateau.
//
//   evaluator.rs  — Mean dev loss over a loader.
//
//   translator.rs — Dev-set decoding into hypothesis and
//                   reference strings.
//
//   trainer.rs    — Gradient accumulation, per-epoch orchestration
//                   and checkpoint snapshots.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Encoder-decoder model interface
pub mod seq2seq;

/// Transformer encoder-decoder architecture
pub mod model;

/// Loss with teacher forcing
pub mod loss;

/// Learning rate schedules
pub mod schedule;

/// Dev loss
pub mod evaluator;

/// Greedy / beam decoding of dev batches
pub mod translator;

/// Training loop with accumulation and checkpointing
pub mod trainer;

#[cfg(test)]
pub mod test_utils;
