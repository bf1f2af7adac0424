// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Persists the run's vocabulary as a HuggingFace tokenizer JSON
// in the save directory, so a resumed run and the `translate`
// command see exactly the ids the model was trained with.
//
//   <save_dir>/vocab.json
//
// Reference: tokenizers crate documentation

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

use crate::infra::vocabulary::Vocabulary;

const VOCAB_FILE: &str = "vocab.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(VOCAB_FILE)
    }

    /// Load the saved vocabulary, or build one from `sentences` and save it.
    pub fn load_or_build<'a>(
        &self,
        sentences:  impl IntoIterator<Item = &'a str>,
        vocab_size: usize,
    ) -> Result<Vocabulary> {
        if self.path().exists() {
            tracing::info!("Loading existing vocabulary from '{}'", self.path().display());
            self.load()
        } else {
            self.rebuild(sentences, vocab_size)
        }
    }

    /// Build from `sentences` and save, replacing any vocabulary already there.
    pub fn rebuild<'a>(
        &self,
        sentences:  impl IntoIterator<Item = &'a str>,
        vocab_size: usize,
    ) -> Result<Vocabulary> {
        if self.path().exists() {
            tracing::warn!(
                "Replacing vocabulary '{}' left by an earlier run",
                self.path().display()
            );
        }
        tracing::info!("Building new vocabulary (vocab_size={})", vocab_size);
        let vocab = Vocabulary::build(sentences, vocab_size)?;
        self.save(&vocab)?;
        Ok(vocab)
    }

    pub fn save(&self, vocab: &Vocabulary) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        vocab
            .tokenizer()
            .save(&path, true)
            .map_err(|e| anyhow::anyhow!("Cannot write vocabulary to '{}': {e}", path.display()))?;
        tracing::info!("Vocabulary of {} entries saved to '{}'", vocab.len(), path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<Vocabulary> {
        let path = self.path();
        let tokenizer = Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load vocabulary from '{}': {e}", path.display()))?;
        Vocabulary::from_tokenizer(tokenizer)
    }
}
