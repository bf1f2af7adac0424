// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between the application layer and the concrete
// implementations in the data and domain layers.
//
//   CorpusSource      → ParallelCorpusLoader (two aligned text files)
//   TranslationScorer → CorpusBleu (smoothed, word level)
//                       IdBleu     (id level, no smoothing)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::sentence_pair::SentencePair;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can produce aligned sentence pairs.
pub trait CorpusSource {
    /// Load every pair from this source, in corpus order.
    fn load_pairs(&self) -> Result<Vec<SentencePair>>;
}

// ─── TranslationScorer ────────────────────────────────────────────────────────
/// Scores a list of hypotheses against order-corresponding references.
pub trait TranslationScorer {
    /// Short label used in log lines and CLI output
    fn name(&self) -> &str;

    /// Corpus-level score on a 0–100 scale
    fn score(&self, hyps: &[String], refs: &[String]) -> Result<f64>;
}
