// Stub models and criteria for unit tests.
//
//   EchoModel          trainable; logits echo the decoder input,
//                      decoding copies the source up to eos
//   CountingModel      EchoModel plus call counters
//   RecordingModel     remembers the last Seq2SeqInput
//   RecordingCriterion remembers the last logits shape and labels

use burn::{module::Param, prelude::*};
use std::cell::{Cell, RefCell};

use crate::ml::loss::Criterion;
use crate::ml::seq2seq::{BeamOutput, Seq2Seq, Seq2SeqInput};

/// Copy each source row up to and including `eos`, dropping padding.
fn echo_rows<B: Backend>(src: Tensor<B, 2, Int>, eos: u32, max_len: usize) -> Vec<Vec<u32>> {
    let [_, width] = src.dims();
    let values: Vec<u32> = src.into_data().iter::<i64>().map(|v| v as u32).collect();
    values
        .chunks(width.max(1))
        .map(|row| {
            let mut out = Vec::new();
            for &id in row.iter().take(max_len) {
                out.push(id);
                if id == eos {
                    break;
                }
            }
            out
        })
        .collect()
}

#[derive(Module, Debug)]
pub struct EchoModel<B: Backend> {
    pub table:      Param<Tensor<B, 2>>,
    pub vocab_size: usize,
}

impl<B: Backend> EchoModel<B> {
    /// Logit table with `scale` on the diagonal.
    pub fn new(vocab_size: usize, scale: f32, device: &B::Device) -> Self {
        let values: Vec<f32> = (0..vocab_size * vocab_size)
            .map(|i| if i / vocab_size == i % vocab_size { scale } else { 0.0 })
            .collect();
        let table = Tensor::from_data(TensorData::new(values, [vocab_size, vocab_size]), device);
        Self { table: Param::from_tensor(table), vocab_size }
    }

    pub fn table_values(&self) -> Vec<f32> {
        self.table.val().into_data().iter::<f32>().collect()
    }
}

impl<B: Backend> Seq2Seq<B> for EchoModel<B> {
    fn d_model(&self) -> usize {
        16
    }

    fn forward(&self, input: Seq2SeqInput<B>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input.tgt.dims();
        self.table
            .val()
            .select(0, input.tgt.reshape([batch_size * seq_len]))
            .reshape([batch_size, seq_len, self.vocab_size])
            .swap_dims(0, 1)
    }

    fn greedy_decode(
        &self,
        src:               Tensor<B, 2, Int>,
        _src_padding_mask: Tensor<B, 2, Bool>,
        _sos:              u32,
        eos:               u32,
        max_len:           usize,
    ) -> Vec<Vec<u32>> {
        echo_rows(src, eos, max_len)
    }

    fn beam_search(
        &self,
        src:               Tensor<B, 2, Int>,
        _src_padding_mask: Tensor<B, 2, Bool>,
        _sos:              u32,
        eos:               u32,
        max_len:           usize,
        _beam:             usize,
    ) -> BeamOutput {
        let tokens = echo_rows(src, eos, max_len).into_iter().next().unwrap_or_default();
        BeamOutput { tokens: tokens.clone(), score: 0.0, candidates: vec![(tokens, 0.0)] }
    }
}

/// Echo behaviour with call counters and the last beam source shape.
pub struct CountingModel<B: Backend> {
    inner:               EchoModel<B>,
    pub greedy_calls:    Cell<usize>,
    pub beam_calls:      Cell<usize>,
    pub forward_calls:   Cell<usize>,
    pub last_beam_dims:  Cell<Option<[usize; 2]>>,
}

impl<B: Backend> CountingModel<B> {
    pub fn new(vocab_size: usize, device: &B::Device) -> Self {
        Self {
            inner:          EchoModel::new(vocab_size, 1.0, device),
            greedy_calls:   Cell::new(0),
            beam_calls:     Cell::new(0),
            forward_calls:  Cell::new(0),
            last_beam_dims: Cell::new(None),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.greedy_calls.get() + self.beam_calls.get() + self.forward_calls.get()
    }
}

impl<B: Backend> Seq2Seq<B> for CountingModel<B> {
    fn d_model(&self) -> usize {
        self.inner.d_model()
    }

    fn forward(&self, input: Seq2SeqInput<B>) -> Tensor<B, 3> {
        self.forward_calls.set(self.forward_calls.get() + 1);
        self.inner.forward(input)
    }

    fn greedy_decode(
        &self,
        src:              Tensor<B, 2, Int>,
        src_padding_mask: Tensor<B, 2, Bool>,
        sos:              u32,
        eos:              u32,
        max_len:          usize,
    ) -> Vec<Vec<u32>> {
        self.greedy_calls.set(self.greedy_calls.get() + 1);
        self.inner.greedy_decode(src, src_padding_mask, sos, eos, max_len)
    }

    fn beam_search(
        &self,
        src:              Tensor<B, 2, Int>,
        src_padding_mask: Tensor<B, 2, Bool>,
        sos:              u32,
        eos:              u32,
        max_len:          usize,
        beam:             usize,
    ) -> BeamOutput {
        self.beam_calls.set(self.beam_calls.get() + 1);
        self.last_beam_dims.set(Some(src.dims()));
        self.inner.beam_search(src, src_padding_mask, sos, eos, max_len, beam)
    }
}

/// Returns zero logits and keeps the input it was called with.
pub struct RecordingModel<B: Backend> {
    vocab_size: usize,
    last:       RefCell<Option<Seq2SeqInput<B>>>,
}

impl<B: Backend> RecordingModel<B> {
    pub fn new(vocab_size: usize) -> Self {
        Self { vocab_size, last: RefCell::new(None) }
    }

    pub fn last_input(&self) -> Option<Seq2SeqInput<B>> {
        self.last.borrow().clone()
    }
}

impl<B: Backend> Seq2Seq<B> for RecordingModel<B> {
    fn d_model(&self) -> usize {
        16
    }

    fn forward(&self, input: Seq2SeqInput<B>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input.tgt.dims();
        let device = input.tgt.device();
        *self.last.borrow_mut() = Some(input);
        Tensor::zeros([seq_len, batch_size, self.vocab_size], &device)
    }

    fn greedy_decode(
        &self,
        src:               Tensor<B, 2, Int>,
        _src_padding_mask: Tensor<B, 2, Bool>,
        _sos:              u32,
        eos:               u32,
        max_len:           usize,
    ) -> Vec<Vec<u32>> {
        echo_rows(src, eos, max_len)
    }

    fn beam_search(
        &self,
        src:               Tensor<B, 2, Int>,
        _src_padding_mask: Tensor<B, 2, Bool>,
        _sos:              u32,
        eos:               u32,
        max_len:           usize,
        _beam:             usize,
    ) -> BeamOutput {
        let tokens = echo_rows(src, eos, max_len).into_iter().next().unwrap_or_default();
        BeamOutput { tokens: tokens.clone(), score: 0.0, candidates: vec![(tokens, 0.0)] }
    }
}

/// Zero loss; keeps the logits shape and labels of the last call.
pub struct RecordingCriterion<B: Backend> {
    last: RefCell<Option<([usize; 3], Tensor<B, 2, Int>)>>,
}

impl<B: Backend> Default for RecordingCriterion<B> {
    fn default() -> Self {
        Self { last: RefCell::new(None) }
    }
}

impl<B: Backend> RecordingCriterion<B> {
    pub fn last_call(&self) -> Option<([usize; 3], Tensor<B, 2, Int>)> {
        self.last.borrow().clone()
    }
}

impl<B: Backend> Criterion<B> for RecordingCriterion<B> {
    fn loss(&self, logits: Tensor<B, 3>, labels: Tensor<B, 2, Int>) -> Tensor<B, 1> {
        *self.last.borrow_mut() = Some((logits.dims(), labels));
        logits.sum().mul_scalar(0.0)
    }
}
