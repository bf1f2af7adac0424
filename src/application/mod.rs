// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal each: training, translating or scoring.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Corpus → vocabulary → epochs of training with checkpoints
pub mod train_use_case;

// Saved run → translations of new sentences
pub mod translate_use_case;

// Hypothesis / reference files → BLEU
pub mod score_use_case;
