// ============================================================
// Layer 4 — Translation Batcher & Batch Preprocessor
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<TranslationSample>
// into padded id tensors, and the preprocessing step that runs
// on every batch before the model sees it.
//
// Batching:
//   Input:  N samples of varying length (sos … eos)
//   Output: TranslationBatch with tensors of width max_len
//
//   ids           [N, max_len]   pad id 0 after the sentence
//   padding mask  [N, max_len]   true exactly where padding
//   lengths       [N]            true length incl. sos/eos
//
// Preprocessing (trim + to_device):
//   Every batch is allocated at the static max_len width, but
//   most batches are much shorter. trim() cuts each side back
//   to the longest true length in the batch, so attention runs
//   over S' ≤ max_len positions instead of max_len.
//
//     src_tokens [N, 100] ──trim──► [N, S']   S' = max(src_lengths)
//     tgt_tokens [N, 100] ──trim──► [N, T']   T' = max(tgt_lengths)
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TranslationSample;
use crate::infra::vocabulary::PAD_ID;

// ─── TranslationBatch ─────────────────────────────────────────────────────────
/// A batch of sentence pairs. All tensors have the batch size as
/// their first dimension.
#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    /// Source ids — [batch_size, src_width]
    pub src_tokens: Tensor<B, 2, Int>,

    /// true where the source position is padding — [batch_size, src_width]
    pub src_padding_mask: Tensor<B, 2, Bool>,

    /// True source lengths — [batch_size]
    pub src_lengths: Tensor<B, 1, Int>,

    /// Target ids — [batch_size, tgt_width]
    pub tgt_tokens: Tensor<B, 2, Int>,

    /// true where the target position is padding — [batch_size, tgt_width]
    pub tgt_padding_mask: Tensor<B, 2, Bool>,

    /// True target lengths — [batch_size]
    pub tgt_lengths: Tensor<B, 1, Int>,
}

fn max_length<B: Backend>(lengths: &Tensor<B, 1, Int>) -> usize {
    lengths.clone().max().into_scalar().elem::<i64>().max(0) as usize
}

impl<B: Backend> TranslationBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.src_tokens.dims()[0]
    }

    /// Cut both sides to the longest true length in the batch.
    pub fn trim(self) -> Self {
        let batch_size = self.batch_size();
        if batch_size == 0 {
            return self;
        }
        let src_len = max_length(&self.src_lengths).min(self.src_tokens.dims()[1]);
        let tgt_len = max_length(&self.tgt_lengths).min(self.tgt_tokens.dims()[1]);

        Self {
            src_tokens:       self.src_tokens.slice([0..batch_size, 0..src_len]),
            src_padding_mask: self.src_padding_mask.slice([0..batch_size, 0..src_len]),
            src_lengths:      self.src_lengths,
            tgt_tokens:       self.tgt_tokens.slice([0..batch_size, 0..tgt_len]),
            tgt_padding_mask: self.tgt_padding_mask.slice([0..batch_size, 0..tgt_len]),
            tgt_lengths:      self.tgt_lengths,
        }
    }

    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            src_tokens:       self.src_tokens.to_device(device),
            src_padding_mask: self.src_padding_mask.to_device(device),
            src_lengths:      self.src_lengths.to_device(device),
            tgt_tokens:       self.tgt_tokens.to_device(device),
            tgt_padding_mask: self.tgt_padding_mask.to_device(device),
            tgt_lengths:      self.tgt_lengths.to_device(device),
        }
    }

    /// trim() then to_device(): run once on every batch before use.
    pub fn prepare(self, device: &B::Device) -> Self {
        self.trim().to_device(device)
    }
}

// ─── TranslationBatcher ───────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct TranslationBatcher<B: Backend> {
    pub device:  B::Device,
    /// Static width every batch is padded to
    pub max_len: usize,
}

impl<B: Backend> TranslationBatcher<B> {
    pub fn new(device: B::Device, max_len: usize) -> Self {
        Self { device, max_len }
    }

    /// Pad one side of the batch: ids, padding mask, lengths.
    fn pad_side(
        &self,
        seqs: Vec<&[u32]>,
    ) -> (Tensor<B, 2, Int>, Tensor<B, 2, Bool>, Tensor<B, 1, Int>) {
        let batch_size = seqs.len();
        let width      = self.max_len;

        let mut ids     = Vec::with_capacity(batch_size * width);
        let mut mask    = Vec::with_capacity(batch_size * width);
        let mut lengths = Vec::with_capacity(batch_size);

        for seq in seqs {
            let seq = &seq[..seq.len().min(width)];
            // Trailing pad ids already in the sample do not count
            let len = seq.iter().rposition(|&id| id != PAD_ID).map_or(0, |p| p + 1);

            ids.extend(seq.iter().map(|&id| id as i64));
            ids.extend(std::iter::repeat(PAD_ID as i64).take(width - seq.len()));
            mask.extend((0..width).map(|pos| pos >= len));
            lengths.push(len as i64);
        }

        (
            int_tensor(ids, [batch_size, width], &self.device),
            Tensor::from_data(TensorData::new(mask, [batch_size, width]), &self.device),
            int_tensor(lengths, [batch_size], &self.device),
        )
    }
}

/// Build an Int tensor from i64 values on any backend.
pub fn int_tensor<B: Backend, const D: usize>(
    values: Vec<i64>,
    shape:  [usize; D],
    device: &B::Device,
) -> Tensor<B, D, Int> {
    Tensor::from_data(TensorData::new(values, shape).convert::<B::IntElem>(), device)
}

impl<B: Backend> Batcher<TranslationSample, TranslationBatch<B>> for TranslationBatcher<B> {
    fn batch(&self, items: Vec<TranslationSample>) -> TranslationBatch<B> {
        let (src_tokens, src_padding_mask, src_lengths) =
            self.pad_side(items.iter().map(|s| s.src_ids.as_slice()).collect());
        let (tgt_tokens, tgt_padding_mask, tgt_lengths) =
            self.pad_side(items.iter().map(|s| s.tgt_ids.as_slice()).collect());

        TranslationBatch {
            src_tokens,
            src_padding_mask,
            src_lengths,
            tgt_tokens,
            tgt_padding_mask,
            tgt_lengths,
        }
    }
}
