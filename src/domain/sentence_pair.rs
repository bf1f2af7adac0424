// ============================================================
// Layer 3 — SentencePair Domain Type
// ============================================================
// One line of a parallel corpus: a source sentence and its
// reference translation, both already split into subwords
// separated by single spaces (BPE continuation marker "@@").
//
// Example:
//   source: "das ist ein Ver@@ such"
//   target: "this is a tri@@ al"

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    /// Subword tokens of the source sentence, space separated
    pub source: String,

    /// Subword tokens of the reference translation, space separated
    pub target: String,
}

impl SentencePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Both sides contain at least one token
    pub fn is_complete(&self) -> bool {
        !self.source.trim().is_empty() && !self.target.trim().is_empty()
    }
}
