// ============================================================
// Layer 6 — Results Log
// ============================================================
// Appends one line per epoch to <save_dir>/results.txt:
//
//   epoch,dev_loss,dev_bleu
//   1,4.812331,3.270000
//   2,4.120907,7.914400
//   3,3.998210,NaN          ← BLEU not evaluated this epoch
//
// The header is written only by a run that starts at epoch 1.
// The file is only ever appended to: a resumed run, or a new
// run in the same save dir, writes below the lines already there.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

pub const RESULTS_HEADER: &str = "epoch,dev_loss,dev_bleu";
const RESULTS_FILE: &str = "results.txt";

/// What one epoch produced on the dev set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,

    /// Mean per-batch teacher-forced loss
    pub dev_loss: f64,

    /// Corpus BLEU in [0, 100], NaN when not evaluated
    pub dev_bleu: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, dev_loss: f64, dev_bleu: f64) -> Self {
        Self { epoch, dev_loss, dev_bleu }
    }
}

pub struct ResultsLog {
    path: PathBuf,
}

impl ResultsLog {
    /// Open the log for a run starting at `start_epoch`.
    pub fn new(dir: impl AsRef<Path>, start_epoch: usize) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(RESULTS_FILE);

        let log = Self { path };
        if start_epoch == 1 {
            writeln!(log.open()?, "{RESULTS_HEADER}")
                .with_context(|| format!("Cannot write '{}'", log.path.display()))?;
            tracing::debug!("Started results log: '{}'", log.path.display());
        }

        Ok(log)
    }

    fn open(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot open '{}'", self.path.display()))
    }

    pub fn append(&self, m: &EpochMetrics) -> Result<()> {
        writeln!(self.open()?, "{},{:.6},{:.6}", m.epoch, m.dev_loss, m.dev_bleu)
            .with_context(|| format!("Cannot write '{}'", self.path.display()))?;

        tracing::debug!(
            "Logged epoch {}: dev_loss={:.4}, dev_bleu={:.2}",
            m.epoch,
            m.dev_loss,
            m.dev_bleu,
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_only_on_fresh_run() {
        let dir = tempfile::tempdir().unwrap();

        let log = ResultsLog::new(dir.path(), 1).unwrap();
        log.append(&EpochMetrics::new(1, 2.0, 10.0)).unwrap();

        // Resume at epoch 2: no second header
        let log = ResultsLog::new(dir.path(), 2).unwrap();
        log.append(&EpochMetrics::new(2, 1.5, f64::NAN)).unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["epoch,dev_loss,dev_bleu", "1,2.000000,10.000000", "2,1.500000,NaN"]
        );
    }

    #[test]
    fn test_new_run_in_same_dir_keeps_earlier_lines() {
        let dir = tempfile::tempdir().unwrap();

        let log = ResultsLog::new(dir.path(), 1).unwrap();
        log.append(&EpochMetrics::new(1, 2.0, 10.0)).unwrap();
        log.append(&EpochMetrics::new(2, 1.5, 12.0)).unwrap();

        let log = ResultsLog::new(dir.path(), 1).unwrap();
        log.append(&EpochMetrics::new(1, 3.0, 5.0)).unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec![
                "epoch,dev_loss,dev_bleu",
                "1,2.000000,10.000000",
                "2,1.500000,12.000000",
                "epoch,dev_loss,dev_bleu",
                "1,3.000000,5.000000",
            ]
        );
    }
}
