// ============================================================
// Layer 3 — BLEU Scorer
// ============================================================
// Corpus-level BLEU-4 over whitespace-tokenised strings.
//
//   BLEU = BP * exp( Σ_n  w_n * log p_n ),   w_n = 1/4, n = 1..4
//
//   p_n  = clipped n-gram matches / hypothesis n-grams, summed
//          over the whole corpus before dividing
//   BP   = 1                      if c > r
//          exp(1 - r / c)         otherwise   (0 when c == 0)
//
// When a precision is zero the geometric mean collapses, so one
// of eight smoothing strategies (Chen & Cherry, 2014) rewrites
// the precision vector first. Method 0 leaves it alone.
//
// A second, id-level scorer (IdBleu) maps every word to an
// integer through an explicitly built table and scores the id
// sequences without smoothing.
//
// Reference: Papineni et al. (2002) BLEU
//            Chen & Cherry (2014) A Systematic Comparison of
//            Smoothing Techniques for Sentence-Level BLEU

use anyhow::{bail, ensure, Result};
use std::collections::HashMap;
use std::hash::Hash;

use crate::domain::traits::TranslationScorer;

/// Highest n-gram order scored
pub const MAX_ORDER: usize = 4;

const EPSILON: f64 = 0.1;
const ALPHA: f64 = 5.0;
const K: f64 = 5.0;

// ─── N-gram statistics ────────────────────────────────────────────────────────

/// Clipped match count over total hypothesis n-grams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Precision {
    pub matched: usize,
    pub total:   usize,
}

impl Precision {
    pub fn value(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64
        }
    }
}

fn count_ngrams<T: Eq + Hash>(tokens: &[T], n: usize) -> HashMap<&[T], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for window in tokens.windows(n) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

/// Modified n-gram precision of one hypothesis against one reference.
/// The denominator is never below 1 so an empty hypothesis scores 0/1.
pub fn modified_precision<T: Eq + Hash>(reference: &[T], hypothesis: &[T], n: usize) -> Precision {
    let hyp_counts = count_ngrams(hypothesis, n);
    let ref_counts = count_ngrams(reference, n);

    let matched = hyp_counts
        .iter()
        .map(|(ngram, &count)| count.min(ref_counts.get(ngram).copied().unwrap_or(0)))
        .sum();
    let total = hyp_counts.values().sum::<usize>().max(1);

    Precision { matched, total }
}

fn brevity_penalty(ref_len: usize, hyp_len: usize) -> f64 {
    if hyp_len > ref_len {
        1.0
    } else if hyp_len == 0 {
        0.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    }
}

// ─── Smoothing ────────────────────────────────────────────────────────────────

/// The eight smoothing strategies, selectable by number 0–7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Smoothing {
    /// 0: zero precisions become the smallest positive float
    None,
    /// 1: add epsilon to zero match counts
    Epsilon,
    /// 2: add one to numerator and denominator for n > 1
    AddOne,
    /// 3: NIST geometric sequence 1/2^k for the k-th zero
    NistGeometric,
    /// 4: like 3 but scaled by the log of the hypothesis length
    LengthScaled,
    /// 5: average of the n-1, n and n+1 precisions
    NeighbourAverage,
    /// 6: interpolate with a prior extrapolated from lower orders
    InterpolatedPrior,
    /// 7: method 4 followed by method 5
    LengthScaledAverage,
}

impl Smoothing {
    pub fn from_index(index: usize) -> Result<Self> {
        Ok(match index {
            0 => Self::None,
            1 => Self::Epsilon,
            2 => Self::AddOne,
            3 => Self::NistGeometric,
            4 => Self::LengthScaled,
            5 => Self::NeighbourAverage,
            6 => Self::InterpolatedPrior,
            7 => Self::LengthScaledAverage,
            other => bail!("Unknown smoothing method {other}; expected 0-7"),
        })
    }
}

/// Inputs some smoothing methods need beyond the precision vector.
/// `last_*` refer to the final pair of the corpus.
struct SmoothingContext {
    hyp_len:      usize,
    last_hyp_len: usize,
    fifth_order:  Precision,
}

fn length_scaled(p_n: &[Precision], hyp_len: usize) -> Vec<f64> {
    let mut k_th = 1;
    p_n.iter()
        .map(|p| {
            if p.matched == 0 && hyp_len > 1 {
                let numerator = 1.0 / (2f64.powi(k_th) * K / (hyp_len as f64).ln());
                k_th += 1;
                numerator / p.total as f64
            } else {
                p.value()
            }
        })
        .collect()
}

fn neighbour_average(mut values: Vec<f64>, fifth_order: f64) -> Vec<f64> {
    let mut next: Vec<f64> = values.clone();
    next.push(fifth_order);
    let mut prev = values[0] + 1.0;
    for i in 0..values.len() {
        let smoothed = (prev + values[i] + next[i + 1]) / 3.0;
        values[i] = smoothed;
        prev = smoothed;
    }
    values
}

impl Smoothing {
    fn apply(&self, p_n: &[Precision], ctx: &SmoothingContext) -> Result<Vec<f64>> {
        let smoothed = match self {
            Self::None => p_n
                .iter()
                .map(|p| {
                    if p.matched == 0 {
                        tracing::debug!("zero n-gram matches; BLEU collapses towards 0");
                        f64::MIN_POSITIVE
                    } else {
                        p.value()
                    }
                })
                .collect(),

            Self::Epsilon => p_n
                .iter()
                .map(|p| {
                    if p.matched == 0 {
                        EPSILON / p.total as f64
                    } else {
                        p.value()
                    }
                })
                .collect(),

            Self::AddOne => p_n
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    if i == 0 {
                        p.value()
                    } else {
                        (p.matched + 1) as f64 / (p.total + 1) as f64
                    }
                })
                .collect(),

            Self::NistGeometric => {
                let mut k_th = 1;
                p_n.iter()
                    .map(|p| {
                        if p.matched == 0 {
                            let v = 1.0 / (2f64.powi(k_th) * p.total as f64);
                            k_th += 1;
                            v
                        } else {
                            p.value()
                        }
                    })
                    .collect()
            }

            Self::LengthScaled => length_scaled(p_n, ctx.hyp_len),

            Self::NeighbourAverage => {
                let values = p_n.iter().map(Precision::value).collect();
                neighbour_average(values, ctx.fifth_order.value())
            }

            Self::InterpolatedPrior => {
                ensure!(
                    p_n.len() > 2 && p_n[2].matched > 0,
                    "Smoothing method 6 requires a non-zero trigram precision"
                );
                let mut values: Vec<f64> = p_n.iter().map(Precision::value).collect();
                for i in 2..values.len() {
                    let prior = if values[i - 2] == 0.0 {
                        0.0
                    } else {
                        values[i - 1].powi(2) / values[i - 2]
                    };
                    let ngrams_in_hyp = ctx.last_hyp_len.saturating_sub(i) as f64;
                    values[i] = (p_n[i].matched as f64 + ALPHA * prior) / (ngrams_in_hyp + ALPHA);
                }
                values
            }

            Self::LengthScaledAverage => {
                let values = length_scaled(p_n, ctx.hyp_len);
                neighbour_average(values, ctx.fifth_order.value())
            }
        };
        Ok(smoothed)
    }
}

// ─── Corpus BLEU ──────────────────────────────────────────────────────────────

/// Corpus BLEU-4 in [0, 1] over pre-tokenised sequences, one reference each.
pub fn corpus_bleu<T: Eq + Hash>(
    references: &[Vec<T>],
    hypotheses: &[Vec<T>],
    smoothing:  Smoothing,
) -> Result<f64> {
    ensure!(
        references.len() == hypotheses.len(),
        "BLEU needs one reference per hypothesis ({} references, {} hypotheses)",
        references.len(),
        hypotheses.len()
    );

    let mut p_n = [Precision::default(); MAX_ORDER];
    let mut hyp_len = 0usize;
    let mut ref_len = 0usize;

    for (reference, hypothesis) in references.iter().zip(hypotheses) {
        for (i, p) in p_n.iter_mut().enumerate() {
            let sentence = modified_precision(reference, hypothesis, i + 1);
            p.matched += sentence.matched;
            p.total   += sentence.total;
        }
        hyp_len += hypothesis.len();
        ref_len += reference.len();
    }

    // No unigram matches (this includes the empty corpus)
    if p_n[0].matched == 0 {
        return Ok(0.0);
    }

    let (last_ref, last_hyp) = match (references.last(), hypotheses.last()) {
        (Some(r), Some(h)) => (r, h),
        _ => return Ok(0.0),
    };
    let ctx = SmoothingContext {
        hyp_len,
        last_hyp_len: last_hyp.len(),
        fifth_order:  modified_precision(last_ref, last_hyp, MAX_ORDER + 1),
    };

    let smoothed = smoothing.apply(&p_n, &ctx)?;
    let weight = 1.0 / MAX_ORDER as f64;
    let log_sum: f64 = smoothed.iter().map(|p| weight * p.ln()).sum();

    Ok(brevity_penalty(ref_len, hyp_len) * log_sum.exp())
}

/// Corpus BLEU-4 of whitespace-tokenised strings, as a percentage.
pub fn eval_bleu(hyps: &[String], refs: &[String], smoothing_method: usize) -> Result<f64> {
    let smoothing = Smoothing::from_index(smoothing_method)?;
    let references: Vec<Vec<&str>> = refs.iter().map(|r| r.split_whitespace().collect()).collect();
    let hypotheses: Vec<Vec<&str>> = hyps.iter().map(|h| h.split_whitespace().collect()).collect();
    Ok(100.0 * corpus_bleu(&references, &hypotheses, smoothing)?)
}

/// Word-level BLEU with a fixed smoothing strategy.
pub struct CorpusBleu {
    smoothing_method: usize,
}

impl CorpusBleu {
    pub fn new(smoothing_method: usize) -> Result<Self> {
        Smoothing::from_index(smoothing_method)?;
        Ok(Self { smoothing_method })
    }
}

impl TranslationScorer for CorpusBleu {
    fn name(&self) -> &str {
        "corpus-bleu"
    }

    fn score(&self, hyps: &[String], refs: &[String]) -> Result<f64> {
        eval_bleu(hyps, refs, self.smoothing_method)
    }
}

// ─── Id-level BLEU ────────────────────────────────────────────────────────────

/// Explicit word → id table for the id-level scorer.
/// Ids 0–3 are reserved (pad, unused, eos, unk); words start at 4.
#[derive(Debug, Default)]
pub struct WordIds {
    ids: HashMap<String, u32>,
}

impl WordIds {
    pub const PAD: u32 = 0;
    pub const EOS: u32 = 2;
    pub const FIRST_WORD: u32 = 4;

    /// Assign ids to every word in first-seen order.
    pub fn build<'a>(sentences: impl IntoIterator<Item = &'a str>) -> Self {
        let mut ids = HashMap::new();
        for sentence in sentences {
            for word in sentence.split_whitespace() {
                let next = Self::FIRST_WORD + ids.len() as u32;
                ids.entry(word.to_string()).or_insert(next);
            }
        }
        Self { ids }
    }

    pub fn lookup(&self, word: &str) -> Option<u32> {
        self.ids.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn encode(&self, sentence: &str) -> Result<Vec<u32>> {
        sentence
            .split_whitespace()
            .map(|w| {
                self.lookup(w)
                    .ok_or_else(|| anyhow::anyhow!("Word '{w}' missing from the id table"))
            })
            .collect()
    }
}

/// Accumulated id-level statistics: unsmoothed BLEU-4.
#[derive(Debug, Default, Clone)]
pub struct IdBleuStats {
    p_n:      [Precision; MAX_ORDER],
    pred_len: usize,
    ref_len:  usize,
}

impl IdBleuStats {
    pub fn add(&mut self, reference: &[u32], hypothesis: &[u32]) {
        let strip = |ids: &[u32]| -> Vec<u32> {
            ids.iter()
                .copied()
                .filter(|&id| id != WordIds::PAD && id != WordIds::EOS)
                .collect()
        };
        let reference  = strip(reference);
        let hypothesis = strip(hypothesis);

        for (i, p) in self.p_n.iter_mut().enumerate() {
            let n = i + 1;
            let hyp_counts = count_ngrams(&hypothesis, n);
            let ref_counts = count_ngrams(&reference, n);
            p.matched += hyp_counts
                .iter()
                .map(|(g, &c)| c.min(ref_counts.get(g).copied().unwrap_or(0)))
                .sum::<usize>();
            p.total += hypothesis.len().saturating_sub(n - 1);
        }
        self.pred_len += hypothesis.len();
        self.ref_len  += reference.len();
    }

    pub fn precisions(&self) -> [f64; MAX_ORDER] {
        self.p_n.map(|p| p.value())
    }

    pub fn brevity(&self) -> f64 {
        let ratio = self.ref_len as f64 / self.pred_len as f64;
        (1.0 - ratio).exp().min(1.0)
    }

    /// Score on a 0–100 scale; any zero precision gives 0.
    pub fn score(&self) -> f64 {
        let log_sum: f64 = self.precisions().iter().map(|p| p.ln()).sum();
        let score = self.brevity() * (log_sum / MAX_ORDER as f64).exp() * 100.0;
        if score.is_nan() { 0.0 } else { score }
    }
}

/// Id-level scorer: builds the word table from the refs then the hyps.
pub struct IdBleu;

impl TranslationScorer for IdBleu {
    fn name(&self) -> &str {
        "id-bleu"
    }

    fn score(&self, hyps: &[String], refs: &[String]) -> Result<f64> {
        ensure!(
            hyps.len() == refs.len(),
            "BLEU needs one reference per hypothesis ({} references, {} hypotheses)",
            refs.len(),
            hyps.len()
        );
        let table = WordIds::build(refs.iter().chain(hyps).map(String::as_str));
        let mut stats = IdBleuStats::default();
        for (r, h) in refs.iter().zip(hyps) {
            stats.add(&table.encode(r)?, &table.encode(h)?);
        }
        Ok(stats.score())
    }
}
