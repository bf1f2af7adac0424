// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs      — One immutable checkpoint per epoch
//                        (model + optimiser records via burn's
//                        BinBytesRecorder, wrapped with bincode),
//                        plus the run config as JSON.
//
//   vocabulary.rs      — Word-level vocabulary over BPE subwords,
//                        backed by a `tokenizers` WordLevel model,
//                        with pad/unk/sos/eos at ids 0–3.
//
//   tokenizer_store.rs — Saves/loads the vocabulary JSON so
//                        resume and translate use the same ids.
//
//   metrics.rs         — results.txt, one line per epoch.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Checkpoint saving and loading
pub mod checkpoint;

/// Shared source/target vocabulary
pub mod vocabulary;

/// Vocabulary persistence
pub mod tokenizer_store;

/// Per-epoch results log
pub mod metrics;
