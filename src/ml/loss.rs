// ============================================================
// Layer 5 — Loss Computer (teacher forcing)
// ============================================================
// Shifts the target by one position so the decoder predicts
// token t+1 from tokens ≤ t:
//
//   tgt         <s>  a  b  c  </s>
//   tgt input   <s>  a  b  c          (last position dropped)
//   labels           a  b  c  </s>    (first position dropped)
//
// The target padding mask is cut like the target input, a causal
// mask of size T-1 hides future positions, and the encoder
// output is masked with the source padding mask.
//
// The model returns [T-1, N, V]; the criterion takes the
// class dimension second, so logits are permuted to [N, V, T-1].
//
// Reference: Williams & Zipser (1989) teacher forcing

use burn::{nn::loss::CrossEntropyLossConfig, prelude::*};

use crate::data::batcher::TranslationBatch;
use crate::ml::seq2seq::{subsequent_mask, Seq2Seq, Seq2SeqInput};

/// A scalar training objective over per-position logits.
pub trait Criterion<B: Backend> {
    /// logits: [N, V, T], labels: [N, T] → [1]
    fn loss(&self, logits: Tensor<B, 3>, labels: Tensor<B, 2, Int>) -> Tensor<B, 1>;
}

/// Cross-entropy averaged over non-padding positions only.
#[derive(Debug, Clone, Copy)]
pub struct MaskedCrossEntropy {
    pub pad_id: usize,
}

impl MaskedCrossEntropy {
    pub fn new(pad_id: usize) -> Self {
        Self { pad_id }
    }
}

impl<B: Backend> Criterion<B> for MaskedCrossEntropy {
    fn loss(&self, logits: Tensor<B, 3>, labels: Tensor<B, 2, Int>) -> Tensor<B, 1> {
        let [batch_size, vocab, seq_len] = logits.dims();
        let positions = batch_size * seq_len;
        let device    = logits.device();

        let flat_logits = logits.swap_dims(1, 2).reshape([positions, vocab]);
        let flat_labels = labels.reshape([positions]);

        let ce = CrossEntropyLossConfig::new()
            .with_pad_tokens(Some(vec![self.pad_id]))
            .init(&device);

        // burn zeroes pad positions but still divides by every position
        let real = flat_labels
            .clone()
            .not_equal_elem(self.pad_id as i64)
            .float()
            .sum()
            .clamp_min(1.0);

        ce.forward(flat_logits, flat_labels)
            .mul_scalar(positions as f64)
            .div(real)
    }
}

/// One teacher-forced loss for a prepared batch. Does not touch
/// the model's parameters.
pub fn compute_loss<B, M, C>(model: &M, criterion: &C, batch: &TranslationBatch<B>) -> Tensor<B, 1>
where
    B: Backend,
    M: Seq2Seq<B>,
    C: Criterion<B>,
{
    let [batch_size, tgt_len] = batch.tgt_tokens.dims();
    let device = batch.tgt_tokens.device();

    let tgt_input = batch.tgt_tokens.clone().slice([0..batch_size, 0..tgt_len - 1]);
    let tgt_pad   = batch.tgt_padding_mask.clone().slice([0..batch_size, 0..tgt_len - 1]);
    let labels    = batch.tgt_tokens.clone().slice([0..batch_size, 1..tgt_len]);

    let logits = model.forward(Seq2SeqInput {
        src:                     batch.src_tokens.clone(),
        tgt:                     tgt_input,
        tgt_mask:                subsequent_mask(tgt_len - 1, &device),
        src_key_padding_mask:    batch.src_padding_mask.clone(),
        tgt_key_padding_mask:    tgt_pad,
        memory_key_padding_mask: batch.src_padding_mask.clone(),
    });

    // [T-1, N, V] → [N, V, T-1]
    criterion.loss(logits.permute([1, 2, 0]), labels)
}
