// ============================================================
// Layer 5 — Translator (dev-set decoding)
// ============================================================
// Turns batches into (hypothesis, reference) string pairs for
// BLEU scoring.
//
//   beam == 1  → one batched greedy_decode call per batch
//   beam  > 1  → beam_search accepts one sentence at a time,
//                so each row of the batch is decoded on its own
//
// Which batches are decoded:
//   BatchSelection::All        every batch of the loader
//   BatchSelection::Sample(k)  k batch indices drawn uniformly
//                              without replacement
//   Sample(0) returns empty lists without touching the model.
//
// Reference: Wu et al. (2016) GNMT §7 (beam search decoding)

use anyhow::Result;
use burn::{data::dataloader::DataLoader, prelude::*};
use rand::{rngs::StdRng, seq::index, SeedableRng};
use std::collections::HashSet;

use crate::data::batcher::TranslationBatch;
use crate::infra::vocabulary::{Vocabulary, EOS_ID, SOS_ID};
use crate::ml::seq2seq::Seq2Seq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSelection {
    All,
    Sample(usize),
}

impl BatchSelection {
    /// Negative counts mean "every batch".
    pub fn from_count(count: isize) -> Self {
        if count < 0 {
            Self::All
        } else {
            Self::Sample(count as usize)
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecodeSettings {
    pub beam:       usize,
    pub max_len:    usize,
    pub unsplit:    bool,
    pub batch_size: usize,
    pub selection:  BatchSelection,
    /// Fixed seed for batch sampling; None draws from entropy
    pub seed:       Option<u64>,
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn rows<B: Backend>(tokens: Tensor<B, 2, Int>) -> Vec<Vec<u32>> {
    let [_, width] = tokens.dims();
    let values: Vec<u32> = tokens.into_data().iter::<i64>().map(|v| v as u32).collect();
    values.chunks(width.max(1)).map(<[u32]>::to_vec).collect()
}

/// Decode one prepared batch into (hypotheses, references).
pub fn translate_batch<B, M>(
    model:    &M,
    batch:    &TranslationBatch<B>,
    vocab:    &Vocabulary,
    settings: &DecodeSettings,
) -> (Vec<String>, Vec<String>)
where
    B: Backend,
    M: Seq2Seq<B>,
{
    let [batch_size, src_len] = batch.src_tokens.dims();

    let outputs: Vec<Vec<u32>> = if settings.beam <= 1 {
        model.greedy_decode(
            batch.src_tokens.clone(),
            batch.src_padding_mask.clone(),
            SOS_ID,
            EOS_ID,
            settings.max_len,
        )
    } else {
        (0..batch_size)
            .map(|i| {
                model
                    .beam_search(
                        batch.src_tokens.clone().slice([i..i + 1, 0..src_len]),
                        batch.src_padding_mask.clone().slice([i..i + 1, 0..src_len]),
                        SOS_ID,
                        EOS_ID,
                        settings.max_len,
                        settings.beam,
                    )
                    .tokens
            })
            .collect()
    };

    let hyps = vocab.idxs_to_sentences(&outputs, settings.unsplit);
    let refs = vocab.idxs_to_sentences(&rows(batch.tgt_tokens.clone()), settings.unsplit);
    (hyps, refs)
}

/// Decode the selected batches of a loader.
pub fn decode_outputs<B, M>(
    model:    &M,
    loader:   &dyn DataLoader<TranslationBatch<B>>,
    vocab:    &Vocabulary,
    settings: &DecodeSettings,
    device:   &B::Device,
) -> Result<(Vec<String>, Vec<String>)>
where
    B: Backend,
    M: Seq2Seq<B>,
{
    let mut hyps = Vec::new();
    let mut refs = Vec::new();

    let chosen: Option<HashSet<usize>> = match settings.selection {
        BatchSelection::Sample(0) => return Ok((hyps, refs)),
        BatchSelection::All => None,
        BatchSelection::Sample(k) => {
            let n_batches = loader.num_items().div_ceil(settings.batch_size.max(1));
            if k > n_batches {
                tracing::warn!(
                    "Asked to decode {} batches but the dev set only has {}; decoding all",
                    k,
                    n_batches
                );
            }
            let mut rng = make_rng(settings.seed);
            Some(index::sample(&mut rng, n_batches, k.min(n_batches)).into_iter().collect())
        }
    };

    for (i, batch) in loader.iter().enumerate() {
        if chosen.as_ref().is_some_and(|c| !c.contains(&i)) {
            continue;
        }
        let batch = batch.prepare(device);
        let (h, r) = translate_batch(model, &batch, vocab, settings);
        hyps.extend(h);
        refs.extend(r);
    }

    tracing::debug!("Decoded {} dev sentences", hyps.len());
    Ok((hyps, refs))
}

/// Log `count` randomly chosen reference/hypothesis pairs.
pub fn print_seqs(hyps: &[String], refs: &[String], count: usize, seed: Option<u64>) {
    let n = hyps.len().min(refs.len());
    if count == 0 || n == 0 {
        return;
    }
    let mut rng = make_rng(seed);
    for i in index::sample(&mut rng, n, count.min(n)).into_iter() {
        tracing::info!("REF: {}", refs[i]);
        tracing::info!("HYP: {}", hyps[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::TranslationBatcher;
    use crate::data::dataset::{TranslationDataset, TranslationSample};
    use crate::ml::test_utils::CountingModel;
    use burn::data::dataloader::batcher::Batcher;
    use burn::backend::NdArray;
    use burn::data::dataloader::DataLoaderBuilder;
    use std::sync::Arc;

    type TB = NdArray;

    fn vocab() -> Vocabulary {
        Vocabulary::from_words(&["a", "b", "c", "d", "e", "f"]).unwrap()
    }

    fn loader(n: usize, batch_size: usize) -> Arc<dyn DataLoader<TranslationBatch<TB>>> {
        let samples = (0..n)
            .map(|i| {
                let word = 4 + (i % 6) as u32;
                TranslationSample::new(vec![2, word, 3], vec![2, word, word, 3])
            })
            .collect();
        DataLoaderBuilder::new(TranslationBatcher::<TB>::new(Default::default(), 8))
            .batch_size(batch_size)
            .build(TranslationDataset::new(samples))
    }

    fn settings(beam: usize, selection: BatchSelection) -> DecodeSettings {
        DecodeSettings {
            beam,
            max_len: 10,
            unsplit: false,
            batch_size: 2,
            selection,
            seed: Some(3),
        }
    }

    #[test]
    fn test_zero_batches_never_calls_model() {
        let model = CountingModel::<TB>::new(10, &Default::default());
        let (hyps, refs) = decode_outputs(
            &model, loader(6, 2).as_ref(), &vocab(), &settings(1, BatchSelection::Sample(0)), &Default::default(),
        )
        .unwrap();

        assert!(hyps.is_empty());
        assert!(refs.is_empty());
        assert_eq!(model.total_calls(), 0);
    }

    #[test]
    fn test_sampled_batches_give_k_times_batch_size_pairs() {
        let model = CountingModel::<TB>::new(10, &Default::default());
        let (hyps, refs) = decode_outputs(
            &model, loader(10, 2).as_ref(), &vocab(), &settings(1, BatchSelection::Sample(3)), &Default::default(),
        )
        .unwrap();

        assert_eq!(hyps.len(), 6);
        assert_eq!(refs.len(), 6);
        assert_eq!(model.greedy_calls.get(), 3);
        assert_eq!(model.beam_calls.get(), 0);
    }

    #[test]
    fn test_all_decodes_every_batch() {
        let model = CountingModel::<TB>::new(10, &Default::default());
        let (hyps, _) = decode_outputs(
            &model, loader(5, 2).as_ref(), &vocab(), &settings(1, BatchSelection::All), &Default::default(),
        )
        .unwrap();

        assert_eq!(hyps.len(), 5);
        assert_eq!(model.greedy_calls.get(), 3);
    }

    #[test]
    fn test_oversized_sample_is_clamped() {
        let model = CountingModel::<TB>::new(10, &Default::default());
        let (hyps, _) = decode_outputs(
            &model, loader(4, 2).as_ref(), &vocab(), &settings(1, BatchSelection::Sample(9)), &Default::default(),
        )
        .unwrap();
        assert_eq!(hyps.len(), 4);
    }

    #[test]
    fn test_beam_decodes_one_row_at_a_time() {
        let model = CountingModel::<TB>::new(10, &Default::default());
        let (hyps, refs) = decode_outputs(
            &model, loader(4, 2).as_ref(), &vocab(), &settings(3, BatchSelection::All), &Default::default(),
        )
        .unwrap();

        assert_eq!(model.beam_calls.get(), 4);
        assert_eq!(model.greedy_calls.get(), 0);
        assert_eq!(model.last_beam_dims.get().map(|d| d[0]), Some(1));
        assert_eq!(hyps.len(), refs.len());
    }

    #[test]
    fn test_hypotheses_and_references_are_detokenised() {
        let model = CountingModel::<TB>::new(10, &Default::default());
        let batch = TranslationBatcher::<TB>::new(Default::default(), 4)
            .batch(vec![
                TranslationSample::new(vec![2, 4, 5, 3], vec![2, 7, 3]),
                TranslationSample::new(vec![2, 6, 3],    vec![2, 8, 9, 3]),
            ]);

        let (hyps, refs) = translate_batch(&model, &batch, &vocab(), &settings(1, BatchSelection::All));
        assert_eq!(hyps, vec!["a b".to_string(), "c".to_string()]);
        assert_eq!(refs, vec!["d".to_string(), "e f".to_string()]);
    }

    #[test]
    fn test_negative_count_means_all() {
        assert_eq!(BatchSelection::from_count(-1), BatchSelection::All);
        assert_eq!(BatchSelection::from_count(5), BatchSelection::Sample(5));
    }
}
