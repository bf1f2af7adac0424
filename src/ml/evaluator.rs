// ============================================================
// Layer 5 — Dev Loss Evaluator
// ============================================================
// Mean teacher-forced loss over a dataset, one loss per batch:
//
//   dev_loss = (1 / #batches) · Σ_b loss(b)
//
// Callers pass the inference copy of the model (model.valid()):
// dropout is off and no autodiff graph is built. The training
// model itself is never touched, so nothing has to be switched
// back afterwards.
//
// Reference: Burn Book §5 (Training, validation step)

use burn::{data::dataloader::DataLoader, prelude::*};

use crate::data::batcher::TranslationBatch;
use crate::ml::loss::{compute_loss, Criterion};
use crate::ml::seq2seq::Seq2Seq;

/// Mean per-batch loss; NaN when the loader yields no batches.
pub fn eval_loss<B, M, C>(
    model:     &M,
    criterion: &C,
    loader:    &dyn DataLoader<TranslationBatch<B>>,
    device:    &B::Device,
) -> f64
where
    B: Backend,
    M: Seq2Seq<B>,
    C: Criterion<B>,
{
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;

    for batch in loader.iter() {
        let batch = batch.prepare(device);
        let loss: f64 = compute_loss(model, criterion, &batch).into_scalar().elem();
        loss_sum += loss;
        batches  += 1;
    }

    if batches > 0 {
        loss_sum / batches as f64
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::TranslationBatcher;
    use crate::data::dataset::{TranslationDataset, TranslationSample};
    use crate::ml::loss::MaskedCrossEntropy;
    use crate::ml::test_utils::EchoModel;
    use burn::backend::NdArray;
    use burn::data::dataloader::DataLoaderBuilder;

    type TB = NdArray;

    #[test]
    fn test_mean_over_batches() {
        let device = Default::default();
        // Diagonal 0 → uniform logits → every position costs ln(V)
        let model  = EchoModel::<TB>::new(8, 0.0, &device);
        let loader = DataLoaderBuilder::new(TranslationBatcher::<TB>::new(device.clone(), 6))
            .batch_size(2)
            .build(TranslationDataset::new(vec![
                TranslationSample::new(vec![2, 4, 3], vec![2, 5, 6, 3]),
                TranslationSample::new(vec![2, 3],    vec![2, 7, 3]),
                TranslationSample::new(vec![2, 5, 3], vec![2, 3]),
            ]));

        let loss = eval_loss(&model, &MaskedCrossEntropy::new(0), loader.as_ref(), &device);
        assert!((loss - 8f64.ln()).abs() < 1e-5, "got {loss}");
    }

    #[test]
    fn test_batches_weigh_equally_regardless_of_size() {
        let device = Default::default();
        // Diagonal 2 over V=8: a label equal to its decoder input costs
        // ln(e² + 7) − 2, any other label costs ln(e² + 7)
        let model  = EchoModel::<TB>::new(8, 2.0, &device);
        let loader = DataLoaderBuilder::new(TranslationBatcher::<TB>::new(device.clone(), 6))
            .batch_size(2)
            .build(TranslationDataset::new(vec![
                // 4 scored positions: miss, hit, hit, miss
                TranslationSample::new(vec![2, 4, 3], vec![2, 5, 5, 5, 3]),
                // 1 scored position: miss
                TranslationSample::new(vec![2, 4, 3], vec![2, 3]),
                // second batch, 1 scored position: miss
                TranslationSample::new(vec![2, 6, 3], vec![2, 3]),
            ]));

        let miss = (2f64.exp() + 7.0).ln();
        let first  = miss - 2.0 * 2.0 / 5.0;
        let second = miss;
        let per_batch = (first + second) / 2.0;
        let per_token = (5.0 * first + second) / 6.0;

        let loss = eval_loss(&model, &MaskedCrossEntropy::new(0), loader.as_ref(), &device);
        assert!((loss - per_batch).abs() < 1e-4, "got {loss}, want {per_batch}");
        assert!((loss - per_token).abs() > 0.1);
    }

    #[test]
    fn test_empty_dataset_is_nan() {
        let device = Default::default();
        let model  = EchoModel::<TB>::new(8, 1.0, &device);
        let loader = DataLoaderBuilder::new(TranslationBatcher::<TB>::new(device.clone(), 6))
            .batch_size(2)
            .build(TranslationDataset::new(Vec::new()));

        assert!(eval_loss(&model, &MaskedCrossEntropy::new(0), loader.as_ref(), &device).is_nan());
    }
}
