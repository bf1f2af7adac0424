// ============================================================
// Layer 5 — Transformer Encoder-Decoder
// ============================================================
// A post-norm transformer translation model built from burn's
// stock layers, with one embedding table shared by source and
// target (joint vocabulary) and learned positions.
//
//   src ─► embed ─► EncoderBlock × L ─────────────┐ memory
//                                                 ▼
//   tgt ─► embed ─► DecoderBlock × L (self, cross, ffn) ─► Linear ─► logits
//
// Reference: Vaswani et al. (2017) Attention Is All You Need

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};

use crate::data::batcher::int_tensor;
use crate::ml::seq2seq::{subsequent_mask, BeamOutput, Seq2Seq, Seq2SeqInput};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct TranslationModelConfig {
    pub vocab_size:         usize,
    pub max_seq_len:        usize,
    pub d_model:            usize,
    pub num_heads:          usize,
    pub num_encoder_layers: usize,
    pub num_decoder_layers: usize,
    pub d_ff:               usize,
    pub dropout:            f64,
}

impl TranslationModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TranslationModel<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let encoder = (0..self.num_encoder_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let decoder = (0..self.num_decoder_layers)
            .map(|_| self.build_decoder_block(device))
            .collect();
        let generator = LinearConfig::new(self.d_model, self.vocab_size).init(device);
        let dropout   = DropoutConfig::new(self.dropout).init();
        TranslationModel {
            token_embedding, position_embedding, encoder, decoder, generator, dropout,
            d_model: self.d_model,
        }
    }

    fn attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device)
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn:   self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        DecoderBlock {
            self_attn:   self.attention(device),
            cross_attn:  self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            norm3:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_output = self.self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub cross_attn:  MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub norm3:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    /// causal: [N, T, T], tgt_pad: [N, T], memory_pad: [N, S]
    pub fn forward(
        &self,
        x:          Tensor<B, 3>,
        memory:     Tensor<B, 3>,
        causal:     Tensor<B, 3, Bool>,
        tgt_pad:    Option<Tensor<B, 2, Bool>>,
        memory_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let mut self_input = MhaInput::self_attn(x.clone()).mask_attn(causal);
        if let Some(pad) = tgt_pad {
            self_input = self_input.mask_pad(pad);
        }
        let attn_output = self.self_attn.forward(self_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));

        let cross_output = self.cross_attn
            .forward(MhaInput::new(x.clone(), memory.clone(), memory).mask_pad(memory_pad))
            .context;
        let x = self.norm2.forward(x + self.dropout.forward(cross_output));

        let ffn_out = self.ffn_linear2.forward(
            activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm3.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct TranslationModel<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub encoder:            Vec<EncoderBlock<B>>,
    pub decoder:            Vec<DecoderBlock<B>>,
    pub generator:          Linear<B>,
    pub dropout:            Dropout,
    pub d_model:            usize,
}

impl<B: Backend> TranslationModel<B> {
    fn embed(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = tokens.dims();
        let device = tokens.device();

        let tok_emb = self.token_embedding
            .forward(tokens)
            .mul_scalar((self.d_model as f64).sqrt());

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        self.dropout.forward(tok_emb + pos_emb)
    }

    /// src: [N, S] → memory: [N, S, d_model]
    pub fn encode(&self, src: Tensor<B, 2, Int>, src_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let mut x = self.embed(src);
        for layer in &self.encoder {
            x = layer.forward(x, src_pad.clone());
        }
        x
    }

    /// tgt: [N, T] → logits: [N, T, V]
    pub fn decode(
        &self,
        tgt:        Tensor<B, 2, Int>,
        memory:     Tensor<B, 3>,
        tgt_mask:   Tensor<B, 2, Bool>,
        tgt_pad:    Option<Tensor<B, 2, Bool>>,
        memory_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = tgt.dims();
        let causal = tgt_mask.unsqueeze::<3>().expand([batch_size, seq_len, seq_len]);

        let mut x = self.embed(tgt);
        for layer in &self.decoder {
            x = layer.forward(x, memory.clone(), causal.clone(), tgt_pad.clone(), memory_pad.clone());
        }
        self.generator.forward(x)
    }

    /// Logits of the last decoder position only — [N, V]
    fn next_token_logits(
        &self,
        prefix:     &[Vec<u32>],
        memory:     Tensor<B, 3>,
        memory_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 2> {
        let batch_size = prefix.len();
        let len        = prefix.first().map_or(0, Vec::len);
        let device     = memory.device();

        let ids: Vec<i64> = prefix.iter().flatten().map(|&id| id as i64).collect();
        let tgt    = int_tensor::<B, 2>(ids, [batch_size, len], &device);
        let logits = self.decode(tgt, memory, subsequent_mask(len, &device), None, memory_pad);
        let [_, _, vocab] = logits.dims();

        logits
            .slice([0..batch_size, len - 1..len, 0..vocab])
            .reshape([batch_size, vocab])
    }
}

impl<B: Backend> Seq2Seq<B> for TranslationModel<B> {
    fn d_model(&self) -> usize {
        self.d_model
    }

    fn forward(&self, input: Seq2SeqInput<B>) -> Tensor<B, 3> {
        let memory = self.encode(input.src, input.src_key_padding_mask);
        let logits = self.decode(
            input.tgt,
            memory,
            input.tgt_mask,
            Some(input.tgt_key_padding_mask),
            input.memory_key_padding_mask,
        );
        // [N, T, V] → [T, N, V]
        logits.swap_dims(0, 1)
    }

    fn greedy_decode(
        &self,
        src:              Tensor<B, 2, Int>,
        src_padding_mask: Tensor<B, 2, Bool>,
        sos:              u32,
        eos:              u32,
        max_len:          usize,
    ) -> Vec<Vec<u32>> {
        let [batch_size, _] = src.dims();
        let memory = self.encode(src, src_padding_mask.clone());

        let mut ys: Vec<Vec<u32>> = vec![vec![sos]; batch_size];
        let mut done = vec![false; batch_size];

        for _ in 1..max_len {
            if done.iter().all(|&d| d) {
                break;
            }
            let next = self
                .next_token_logits(&ys, memory.clone(), src_padding_mask.clone())
                .argmax(1)
                .into_data();

            for ((seq, finished), token) in ys.iter_mut().zip(done.iter_mut()).zip(next.iter::<i64>()) {
                // Finished rows keep repeating eos so the prefix stays rectangular
                let token = if *finished { eos } else { token as u32 };
                seq.push(token);
                *finished |= token == eos;
            }
        }

        for seq in ys.iter_mut() {
            if let Some(pos) = seq.iter().skip(1).position(|&t| t == eos) {
                seq.truncate(pos + 2);
            }
        }
        ys
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
        let beam   = beam.max(1);
        let memory = self.encode(src, src_padding_mask.clone());
        let [_, src_len, d_model] = memory.dims();

        let mut live: Vec<(Vec<u32>, f64)>     = vec![(vec![sos], 0.0)];
        let mut finished: Vec<(Vec<u32>, f64)> = Vec::new();

        for _ in 1..max_len {
            if live.is_empty() || finished.len() >= beam {
                break;
            }
            let width = live.len();
            let prefix: Vec<Vec<u32>> = live.iter().map(|(seq, _)| seq.clone()).collect();
            let logits = self.next_token_logits(
                &prefix,
                memory.clone().expand([width, src_len, d_model]),
                src_padding_mask.clone().expand([width, src_len]),
            );
            let [_, vocab] = logits.dims();
            let log_probs: Vec<f64> = activation::log_softmax(logits, 1)
                .into_data()
                .iter::<f64>()
                .collect();

            let mut expanded: Vec<(usize, u32, f64)> = Vec::with_capacity(width * vocab);
            for (row, (_, score)) in live.iter().enumerate() {
                for token in 0..vocab {
                    expanded.push((row, token as u32, score + log_probs[row * vocab + token]));
                }
            }
            expanded.sort_by(|a, b| b.2.total_cmp(&a.2));
            expanded.truncate(beam);

            let mut next_live = Vec::with_capacity(beam);
            for (row, token, score) in expanded {
                let mut seq = live[row].0.clone();
                seq.push(token);
                if token == eos {
                    finished.push((seq, score));
                } else {
                    next_live.push((seq, score));
                }
            }
            live = next_live;
        }

        if finished.is_empty() {
            finished = live;
        }

        // Length-normalised so longer hypotheses are not penalised for every extra step
        let mut candidates: Vec<(Vec<u32>, f64)> = finished
            .into_iter()
            .map(|(seq, score)| {
                let steps = seq.len().saturating_sub(1).max(1) as f64;
                (seq, score / steps)
            })
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

        let (tokens, score) = candidates
            .first()
            .cloned()
            .unwrap_or_else(|| (vec![sos], 0.0));
        BeamOutput { tokens, score, candidates }
    }
}
