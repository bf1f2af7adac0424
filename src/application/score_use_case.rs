// ============================================================
// Layer 2 — ScoreUseCase
// ============================================================
// Scores a hypothesis file against a reference file, one
// sentence per line, with every available scorer:
//
//   CorpusBleu  word-level corpus BLEU with the chosen smoothing
//   IdBleu      BLEU over word ids, no smoothing

use anyhow::{ensure, Context, Result};
use std::{fs, path::Path};

use crate::domain::bleu::{CorpusBleu, IdBleu};
use crate::domain::traits::TranslationScorer;

pub struct ScoreUseCase {
    scorers: Vec<Box<dyn TranslationScorer>>,
}

impl ScoreUseCase {
    pub fn new(smoothing_method: usize) -> Result<Self> {
        Ok(Self {
            scorers: vec![Box::new(CorpusBleu::new(smoothing_method)?), Box::new(IdBleu)],
        })
    }

    /// (scorer name, score) for each scorer.
    pub fn score(&self, hyps: &[String], refs: &[String]) -> Result<Vec<(String, f64)>> {
        self.scorers
            .iter()
            .map(|s| Ok((s.name().to_string(), s.score(hyps, refs)?)))
            .collect()
    }

    pub fn score_files(&self, hyp_path: &Path, ref_path: &Path) -> Result<Vec<(String, f64)>> {
        let hyps = read_lines(hyp_path)?;
        let refs = read_lines(ref_path)?;
        ensure!(
            hyps.len() == refs.len(),
            "'{}' has {} lines but '{}' has {}",
            hyp_path.display(),
            hyps.len(),
            ref_path.display(),
            refs.len()
        );
        tracing::info!("Scoring {} sentences", hyps.len());
        self.score(&hyps, &refs)
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    Ok(text.lines().map(|l| l.trim().to_string()).collect())
}
