// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from raw parallel text files
// all the way to device-ready tensor batches.
//
// The pipeline flows in this order:
//
//   train.src / train.tgt
//       │
//       ▼
//   ParallelCorpusLoader → reads aligned lines into SentencePairs
//       │
//       ▼
//   Preprocessor         → cleans each line (whitespace, control chars)
//       │
//       ▼
//   split_train_dev      → seeded dev hold-out when no dev files exist
//       │
//       ▼
//   Vocabulary (infra)   → subwords to ids, [sos] … [eos]
//       │
//       ▼
//   TranslationDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   TranslationBatcher   → pads to max_len, masks, lengths
//       │
//       ▼
//   TranslationBatch::prepare → trims to true length, moves to device
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Loads line-aligned source/target files
pub mod loader;

/// Cleans corpus lines
pub mod preprocessor;

/// Implements Burn's Dataset trait for encoded sentence pairs
pub mod dataset;

/// Implements Burn's Batcher trait and the per-batch trim step
pub mod batcher;

/// Seeded train/dev split
pub mod splitter;
