// ============================================================
// Layer 4 — Parallel Corpus Loader
// ============================================================
// Reads a parallel corpus stored as two line-aligned text
// files: line i of the source file translates to line i of
// the target file.
//
//   train.de   das ist ein Ver@@ such
//   train.en   this is a tri@@ al
//
// Each line is cleaned by the Preprocessor before it becomes
// a SentencePair. Pairs where either side is empty after
// cleaning are dropped with a warning; a line count mismatch
// between the two files is an error.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (Reading a File)

use anyhow::{ensure, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::data::preprocessor::Preprocessor;
use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::CorpusSource;

/// Loads aligned sentence pairs from a source and a target file.
/// Implements the CorpusSource trait from Layer 3.
pub struct ParallelCorpusLoader {
    source_path: PathBuf,
    target_path: PathBuf,
}

impl ParallelCorpusLoader {
    pub fn new(source_path: impl AsRef<Path>, target_path: impl AsRef<Path>) -> Self {
        Self {
            source_path: source_path.as_ref().to_path_buf(),
            target_path: target_path.as_ref().to_path_buf(),
        }
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

impl CorpusSource for ParallelCorpusLoader {
    fn load_pairs(&self) -> Result<Vec<SentencePair>> {
        let sources = read_lines(&self.source_path)?;
        let targets = read_lines(&self.target_path)?;

        ensure!(
            sources.len() == targets.len(),
            "Corpus files are not aligned: '{}' has {} lines, '{}' has {}",
            self.source_path.display(),
            sources.len(),
            self.target_path.display(),
            targets.len()
        );

        let preprocessor = Preprocessor::new();
        let mut pairs    = Vec::with_capacity(sources.len());
        let mut skipped  = 0usize;

        for (src, tgt) in sources.iter().zip(&targets) {
            let pair = SentencePair::new(preprocessor.clean(src), preprocessor.clean(tgt));
            if pair.is_complete() {
                pairs.push(pair);
            } else {
                skipped += 1;
            }
        }

        if skipped > 0 {
            tracing::warn!(
                "Skipped {} pairs with an empty side in '{}'",
                skipped,
                self.source_path.display()
            );
        }

        tracing::info!(
            "Loaded {} sentence pairs from '{}'",
            pairs.len(),
            self.source_path.display()
        );
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_loads_aligned_lines() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(dir.path(), "train.src", "a  b\nc\n");
        let tgt = write_file(dir.path(), "train.tgt", "x\ty\nz\n");

        let pairs = ParallelCorpusLoader::new(&src, &tgt).load_pairs().unwrap();
        assert_eq!(pairs, vec![SentencePair::new("a b", "x y"), SentencePair::new("c", "z")]);
    }

    #[test]
    fn test_skips_empty_sides() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(dir.path(), "s", "a\n\nc\n");
        let tgt = write_file(dir.path(), "t", "x\ny\n  \n");

        let pairs = ParallelCorpusLoader::new(&src, &tgt).load_pairs().unwrap();
        assert_eq!(pairs, vec![SentencePair::new("a", "x")]);
    }

    #[test]
    fn test_mismatched_line_counts_fail() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(dir.path(), "s", "a\nb\n");
        let tgt = write_file(dir.path(), "t", "x\n");

        assert!(ParallelCorpusLoader::new(&src, &tgt).load_pairs().is_err());
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ParallelCorpusLoader::new(dir.path().join("nope"), dir.path().join("nada"));
        assert!(loader.load_pairs().is_err());
    }
}
