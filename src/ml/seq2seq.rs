// ============================================================
// Layer 5 — Seq2Seq Model Interface
// ============================================================
// The contract the training loop relies on. Anything that can
// score a teacher-forced target and decode a source sentence
// can be trained and evaluated:
//
//   forward        teacher-forced logits       [T, N, V]
//   greedy_decode  batched arg-max decoding
//   beam_search    beam decoding, ONE source sentence per call
//   d_model        width used by the warmup schedule
//
// Mask convention (same as burn's MultiHeadAttention):
//   true = position is hidden from attention
//
// Reference: Vaswani et al. (2017) Attention Is All You Need

use burn::prelude::*;

/// Inputs for one teacher-forced forward pass.
#[derive(Debug, Clone)]
pub struct Seq2SeqInput<B: Backend> {
    /// Source ids — [N, S]
    pub src: Tensor<B, 2, Int>,
    /// Decoder input ids — [N, T]
    pub tgt: Tensor<B, 2, Int>,
    /// Causal mask over target positions — [T, T]
    pub tgt_mask: Tensor<B, 2, Bool>,
    /// Source padding — [N, S]
    pub src_key_padding_mask: Tensor<B, 2, Bool>,
    /// Target padding — [N, T]
    pub tgt_key_padding_mask: Tensor<B, 2, Bool>,
    /// Padding of the encoder output seen by cross-attention — [N, S]
    pub memory_key_padding_mask: Tensor<B, 2, Bool>,
}

/// Result of decoding one source sentence with a beam.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamOutput {
    /// Best hypothesis, starting with sos
    pub tokens: Vec<u32>,
    /// Its length-normalised log-probability
    pub score: f64,
    /// Every finished hypothesis with its score, best first
    pub candidates: Vec<(Vec<u32>, f64)>,
}

pub trait Seq2Seq<B: Backend> {
    fn d_model(&self) -> usize;

    /// Teacher-forced logits, sequence first — [T, N, V]
    fn forward(&self, input: Seq2SeqInput<B>) -> Tensor<B, 3>;

    /// Batched greedy decoding. Every returned sequence starts with
    /// `sos` and ends at the first `eos` or after `max_len` tokens.
    fn greedy_decode(
        &self,
        src:              Tensor<B, 2, Int>,
        src_padding_mask: Tensor<B, 2, Bool>,
        sos:              u32,
        eos:              u32,
        max_len:          usize,
    ) -> Vec<Vec<u32>>;

    /// Beam decoding of a single source sentence (`src` is [1, S]).
    fn beam_search(
        &self,
        src:              Tensor<B, 2, Int>,
        src_padding_mask: Tensor<B, 2, Bool>,
        sos:              u32,
        eos:              u32,
        max_len:          usize,
        beam:             usize,
    ) -> BeamOutput;
}

/// Causal mask: position i may not attend to any j > i.
pub fn subsequent_mask<B: Backend>(size: usize, device: &B::Device) -> Tensor<B, 2, Bool> {
    let mask: Vec<bool> = (0..size)
        .flat_map(|i| (0..size).map(move |j| j > i))
        .collect();
    Tensor::from_data(TensorData::new(mask, [size, size]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_subsequent_mask_hides_future() {
        let mask = subsequent_mask::<NdArray>(3, &Default::default());
        let values: Vec<bool> = mask.into_data().iter::<bool>().collect();
        assert_eq!(
            values,
            vec![
                false, true,  true,
                false, false, true,
                false, false, false,
            ]
        );
    }
}
