// ============================================================
// Layer 5 — Learning-Rate Schedules
// ============================================================
// Warmup / inverse square root ("Noam") schedule:
//
//   lr(step) = d_model^-0.5 · min(step^-0.5, step · warmup^-1.5)
//
//   rises linearly for `warmup` steps, peaks at step == warmup,
//   then decays with 1/√step.
//
// The step is the global optimiser step count: it starts at 1,
// never resets between epochs, and is owned by TrainingState.
// burn's NoamLrScheduler keeps its own hidden counter, which
// would drift from the accumulation cadence, so the rate is
// computed here as a pure function instead.
//
// ReduceOnPlateau scales the rate down when dev loss stops
// improving. The next warmup recomputation overwrites it.
//
// Reference: Vaswani et al. (2017) §5.3 Optimizer

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

pub const WARMUP_STEPS: usize = 4000;

/// Warmup / inverse-sqrt learning rate. Step 0 is rejected.
pub fn noam_lr(step: usize, d_model: usize, warmup: usize) -> Result<f64> {
    ensure!(step > 0, "Learning-rate schedule is undefined at step 0");
    ensure!(warmup > 0, "Warmup must be at least one step");
    ensure!(d_model > 0, "d_model must be positive");

    let step   = step as f64;
    let warmup = warmup as f64;
    Ok((d_model as f64).powf(-0.5) * step.powf(-0.5).min(step * warmup.powf(-1.5)))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarmupSchedule {
    pub d_model: usize,
    pub warmup:  usize,
}

impl WarmupSchedule {
    pub fn new(d_model: usize, warmup: usize) -> Self {
        Self { d_model, warmup }
    }

    pub fn lr(&self, step: usize) -> Result<f64> {
        noam_lr(step, self.d_model, self.warmup)
    }
}

// ─── ReduceOnPlateau ──────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceOnPlateau {
    pub factor:   f64,
    pub patience: usize,
    pub min_lr:   f64,
    best:         f64,
    bad_epochs:   usize,
}

impl ReduceOnPlateau {
    pub fn new(factor: f64, patience: usize, min_lr: f64) -> Self {
        Self { factor, patience, min_lr, best: f64::INFINITY, bad_epochs: 0 }
    }

    /// Feed one epoch's dev loss; returns the learning rate to use from now on.
    pub fn step(&mut self, dev_loss: f64, lr: f64) -> f64 {
        if dev_loss < self.best {
            self.best       = dev_loss;
            self.bad_epochs = 0;
            return lr;
        }

        self.bad_epochs += 1;
        if self.bad_epochs > self.patience {
            self.bad_epochs = 0;
            let reduced = (lr * self.factor).max(self.min_lr);
            tracing::info!("Dev loss plateaued; learning rate {:.3e} → {:.3e}", lr, reduced);
            reduced
        } else {
            lr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_zero_rejected() {
        assert!(noam_lr(0, 512, WARMUP_STEPS).is_err());
        assert!(WarmupSchedule::new(512, 10).lr(0).is_err());
    }

    #[test]
    fn test_rises_then_decays() {
        let warmup = 50;
        let lrs: Vec<f64> = (1..=200).map(|s| noam_lr(s, 64, warmup).unwrap()).collect();

        for w in lrs[..warmup].windows(2) {
            assert!(w[1] >= w[0]);
        }
        for w in lrs[warmup - 1..].windows(2) {
            assert!(w[1] <= w[0]);
        }

        let peak = lrs.iter().cloned().fold(f64::MIN, f64::max);
        assert_eq!(peak, lrs[warmup - 1]);
    }

    #[test]
    fn test_known_value() {
        // At step == warmup both branches agree: d^-0.5 · w^-0.5
        let lr = noam_lr(4000, 512, 4000).unwrap();
        let expected = 512f64.powf(-0.5) * 4000f64.powf(-0.5);
        assert!((lr - expected).abs() < 1e-12);
    }

    #[test]
    fn test_plateau_reduces_after_patience() {
        let mut plateau = ReduceOnPlateau::new(0.5, 1, 1e-4);
        assert_eq!(plateau.step(2.0, 1e-3), 1e-3);
        // first bad epoch is tolerated
        assert_eq!(plateau.step(2.5, 1e-3), 1e-3);
        // second one reduces
        assert_eq!(plateau.step(2.5, 1e-3), 5e-4);
        // improvement resets
        assert_eq!(plateau.step(1.0, 5e-4), 5e-4);
    }

    #[test]
    fn test_plateau_respects_floor() {
        let mut plateau = ReduceOnPlateau::new(0.1, 0, 1e-4);
        plateau.step(1.0, 2e-4);
        assert_eq!(plateau.step(1.0, 2e-4), 1e-4);
    }
}
