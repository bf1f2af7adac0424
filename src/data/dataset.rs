use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::sentence_pair::SentencePair;
use crate::infra::vocabulary::Vocabulary;

/// One encoded sentence pair: `[sos] ids… [eos]` on both sides.
/// Unpadded; the batcher pads to the fixed width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationSample {
    pub src_ids: Vec<u32>,
    pub tgt_ids: Vec<u32>,
}

impl TranslationSample {
    pub fn new(src_ids: Vec<u32>, tgt_ids: Vec<u32>) -> Self {
        Self { src_ids, tgt_ids }
    }
}

pub struct TranslationDataset {
    samples: Vec<TranslationSample>,
}

impl TranslationDataset {
    pub fn new(samples: Vec<TranslationSample>) -> Self { Self { samples } }

    /// Encode every pair with the shared vocabulary, truncating to `max_len`.
    pub fn from_pairs(pairs: &[SentencePair], vocab: &Vocabulary, max_len: usize) -> Result<Self> {
        let samples = pairs
            .iter()
            .map(|p| {
                Ok(TranslationSample::new(
                    vocab.encode_with_sentinels(&p.source, max_len)?,
                    vocab.encode_with_sentinels(&p.target, max_len)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(samples))
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<TranslationSample> for TranslationDataset {
    fn get(&self, index: usize) -> Option<TranslationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
