// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`     — trains the model on a parallel corpus
//   2. `translate` — loads a checkpoint and translates sentences
//   3. `score`     — BLEU of a hypothesis file against references
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, ScoreArgs, TrainArgs, TranslateArgs};
use std::io::Read;

#[derive(Parser, Debug)]
#[command(
    name = "nmt-trainer",
    version = "0.1.0",
    about = "Train a transformer translation model, translate with it, and score the output."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Translate(args) => run_translate(args),
            Commands::Score(args)     => run_score(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}' → '{}'", args.train_src, args.train_tgt);
    let save_dir = args.save_dir.clone();
    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Checkpoints in '{}'.", save_dir);
    Ok(())
}

fn run_translate(args: TranslateArgs) -> Result<()> {
    use crate::application::translate_use_case::TranslateUseCase;

    let text = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read input '{}'", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("Cannot read stdin")?;
            buf
        }
    };
    let lines: Vec<String> = text.lines().map(str::to_string).collect();

    let use_case = TranslateUseCase::new(
        args.save_dir,
        args.checkpoint,
        args.beam,
        args.batch_size,
        args.unsplit,
        args.device.into(),
    );
    for hyp in use_case.translate(&lines)? {
        println!("{hyp}");
    }
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<()> {
    use crate::application::score_use_case::ScoreUseCase;

    let scores = ScoreUseCase::new(args.smoothing)?.score_files(&args.hyps, &args.refs)?;
    for (name, score) in scores {
        println!("{name}: {score:.2}");
    }
    Ok(())
}
