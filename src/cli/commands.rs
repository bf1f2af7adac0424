// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `translate` and `score`
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::train_use_case::{DeviceKind, TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a translation model on a parallel corpus
    Train(TrainArgs),

    /// Translate sentences with a trained checkpoint
    Translate(TranslateArgs),

    /// Score a hypothesis file against a reference file
    Score(ScoreArgs),
}

/// Compute device for the burn backend
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DeviceArg {
    Cpu,
    Gpu,
}

impl From<DeviceArg> for DeviceKind {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Cpu => DeviceKind::Cpu,
            DeviceArg::Gpu => DeviceKind::Accelerator,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Source side of the training corpus (one BPE-split sentence per line)
    #[arg(long)]
    pub train_src: String,

    /// Target side of the training corpus, line-aligned with --train-src
    #[arg(long)]
    pub train_tgt: String,

    /// Source side of the dev corpus; without it a share of train is held out
    #[arg(long, requires = "dev_tgt")]
    pub dev_src: Option<String>,

    #[arg(long, requires = "dev_src")]
    pub dev_tgt: Option<String>,

    /// Directory for checkpoints, vocabulary, config and results.txt
    #[arg(long, default_value = "checkpoints")]
    pub save_dir: String,

    #[arg(long, default_value_t = 32000)]
    pub vocab_size: usize,

    /// Maximum tokens per sentence including <s> and </s>
    #[arg(long, default_value_t = 100)]
    pub max_len: usize,

    #[arg(long, default_value_t = 512)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub encoder_layers: usize,

    #[arg(long, default_value_t = 6)]
    pub decoder_layers: usize,

    #[arg(long, default_value_t = 2048)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Last epoch to train (inclusive)
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Learning rate of the first optimiser step (default: warmup value at step 1)
    #[arg(long)]
    pub lr: Option<f64>,

    /// Batches accumulated per optimiser step
    #[arg(long, default_value_t = 4)]
    pub accum_steps: usize,

    #[arg(long, default_value_t = 4000)]
    pub warmup_steps: usize,

    /// Enable reduce-on-plateau with this factor
    #[arg(long)]
    pub plateau_factor: Option<f64>,

    #[arg(long, default_value_t = 2)]
    pub plateau_patience: usize,

    #[arg(long, default_value_t = 1e-6)]
    pub min_lr: f64,

    /// Beam width for dev decoding; 1 is greedy
    #[arg(long, default_value_t = 1)]
    pub beam: usize,

    /// Dev batches decoded per epoch for BLEU; negative decodes all
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    pub decode_batches: isize,

    /// BLEU smoothing method (0-7)
    #[arg(long, default_value_t = 1)]
    pub smoothing: usize,

    /// Rejoin BPE subwords before scoring
    #[arg(long)]
    pub unsplit: bool,

    /// Ref/hyp pairs printed after each dev decode
    #[arg(long, default_value_t = 3)]
    pub print_seqs: usize,

    /// Log the training loss every N batches
    #[arg(long, default_value_t = 100)]
    pub report_freq: usize,

    /// Share of the training corpus held out as dev when no dev files are given
    #[arg(long, default_value_t = 0.1)]
    pub dev_fraction: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Continue from the latest checkpoint in --save-dir
    #[arg(long)]
    pub resume: bool,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_src:          a.train_src,
            train_tgt:          a.train_tgt,
            dev_src:            a.dev_src,
            dev_tgt:            a.dev_tgt,
            save_dir:           a.save_dir,
            vocab_size:         a.vocab_size,
            max_len:            a.max_len,
            d_model:            a.d_model,
            num_heads:          a.num_heads,
            num_encoder_layers: a.encoder_layers,
            num_decoder_layers: a.decoder_layers,
            d_ff:               a.d_ff,
            dropout:            a.dropout,
            batch_size:         a.batch_size,
            n_epochs:           a.epochs,
            lr:                 a.lr,
            accum_steps:        a.accum_steps,
            warmup_steps:       a.warmup_steps,
            plateau_factor:     a.plateau_factor,
            plateau_patience:   a.plateau_patience,
            min_lr:             a.min_lr,
            beam:               a.beam,
            decode_batches:     a.decode_batches,
            smoothing_method:   a.smoothing,
            unsplit:            a.unsplit,
            print_seqs:         a.print_seqs,
            report_freq:        a.report_freq,
            dev_fraction:       a.dev_fraction,
            seed:               a.seed,
            num_workers:        a.num_workers,
            resume:             a.resume,
            device:             a.device.into(),
        }
    }
}

/// All arguments for the `translate` command
#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// File with one source sentence per line; reads stdin when omitted
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Directory the training run saved into
    #[arg(long, default_value = "checkpoints")]
    pub save_dir: String,

    /// Specific checkpoint file (default: latest epoch)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    pub beam: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long)]
    pub unsplit: bool,

    #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,
}

/// All arguments for the `score` command
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// System output, one sentence per line
    #[arg(long)]
    pub hyps: PathBuf,

    /// References, line-aligned with --hyps
    #[arg(long)]
    pub refs: PathBuf,

    #[arg(long, default_value_t = 1)]
    pub smoothing: usize,
}
