// ============================================================
// Layer 4 — Train/Dev Splitter
// ============================================================
// When no separate dev files are given, a held-out dev set is
// carved off the training corpus:
//   - Training set: drives the optimiser
//   - Dev set:      dev loss, dev BLEU and the plateau scheduler
//
// The shuffle is seeded so a resumed run holds out exactly
// the same pairs as the run that wrote the checkpoint.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, dev).
///
/// `train_fraction` is clamped to [0, 1]; e.g. 0.9 keeps 90%
/// for training.
pub fn split_train_dev<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let fraction = train_fraction.clamp(0.0, 1.0);
    let split_at = ((total as f64) * fraction).round() as usize;
    let split_at = split_at.min(total);

    let dev = samples.split_off(split_at);

    tracing::debug!(
        "Corpus split: {} training, {} dev ({}% / {}%)",
        samples.len(),
        dev.len(),
        (samples.len() * 100) / total.max(1),
        (dev.len()     * 100) / total.max(1),
    );

    (samples, dev)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, dev)      = split_train_dev(items, 0.8, 7);
        assert_eq!(train.len(), 80);
        assert_eq!(dev.len(),   20);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, dev)      = split_train_dev(items, 0.7, 7);
        let mut all: Vec<usize> = train.into_iter().chain(dev).collect();
        all.sort();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_dev((0..30).collect::<Vec<usize>>(), 0.5, 42);
        let b = split_train_dev((0..30).collect::<Vec<usize>>(), 0.5, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, dev)      = split_train_dev(items, 0.8, 1);
        assert!(train.is_empty());
        assert!(dev.is_empty());
    }

    #[test]
    fn test_full_training_split() {
        let items: Vec<usize> = (0..10).collect();
        let (train, dev)      = split_train_dev(items, 1.0, 1);
        assert_eq!(train.len(), 10);
        assert!(dev.is_empty());
    }
}
