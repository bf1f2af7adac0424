// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, traits and algorithms that describe the
// translation task without touching the tensor framework:
//
//   sentence_pair.rs — one aligned source/target line
//   traits.rs        — corpus sources and translation scorers
//   bleu.rs          — corpus BLEU-4 with Chen & Cherry smoothing,
//                      plus the id-level alternate scorer
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §10 (Traits)
//            Papineni et al. (2002) BLEU

// An aligned source/target sentence
pub mod sentence_pair;

// Core abstractions (traits) that other layers implement
pub mod traits;

// Corpus BLEU scoring
pub mod bleu;
