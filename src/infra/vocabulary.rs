// ============================================================
// Layer 6 — Vocabulary
// ============================================================
// Word-level vocabulary shared by source and target side,
// backed by a HuggingFace `tokenizers` WordLevel model so it
// can be saved and reloaded as a standard tokenizer JSON.
//
// Fixed sentinel ids:
//   0 <pad>   padding
//   1 <unk>   out-of-vocabulary subword
//   2 <s>     start of sentence (sos)
//   3 </s>    end of sentence (eos)
//
// Corpus lines are already BPE-split ("Ver@@ such"), so the
// tokenizer only needs a whitespace pre-tokenizer and no
// normaliser. Words are ranked by frequency with ties broken
// lexicographically so the same corpus always yields the same ids.
//
// Reference: Sennrich et al. (2016) BPE paper
//            tokenizers crate documentation

use anyhow::{ensure, Result};
use std::collections::HashMap;
use std::str::FromStr;
use tokenizers::Tokenizer;

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
pub const SOS_ID: u32 = 2;
pub const EOS_ID: u32 = 3;

pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";
pub const SOS_TOKEN: &str = "<s>";
pub const EOS_TOKEN: &str = "</s>";

const SPECIALS: [(&str, u32); 4] = [
    (PAD_TOKEN, PAD_ID),
    (UNK_TOKEN, UNK_ID),
    (SOS_TOKEN, SOS_ID),
    (EOS_TOKEN, EOS_ID),
];

/// BPE continuation marker glued to a non-final subword
const BPE_MARKER: &str = "@@ ";

#[derive(Clone)]
pub struct Vocabulary {
    tokenizer: Tokenizer,
}

impl Vocabulary {
    /// Build from corpus sentences, keeping at most `max_size`
    /// entries including the four sentinels.
    pub fn build<'a>(sentences: impl IntoIterator<Item = &'a str>, max_size: usize) -> Result<Self> {
        let mut freq: HashMap<&str, usize> = HashMap::new();
        for sentence in sentences {
            for word in sentence.split_whitespace() {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        let mut words: Vec<(&str, usize)> = freq
            .into_iter()
            .filter(|(w, _)| !SPECIALS.iter().any(|(s, _)| s == w))
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        words.truncate(max_size.saturating_sub(SPECIALS.len()));

        let words: Vec<&str> = words.into_iter().map(|(w, _)| w).collect();
        Self::from_words(&words)
    }

    /// Sentinels at 0–3, then `words` in order from id 4.
    /// Duplicates and sentinel strings are skipped.
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Result<Self> {
        let mut vocab = serde_json::Map::new();
        for (token, id) in SPECIALS {
            vocab.insert(token.to_string(), serde_json::json!(id));
        }

        let mut next_id = SPECIALS.len() as u32;
        for word in words {
            let word = word.as_ref();
            if !vocab.contains_key(word) {
                vocab.insert(word.to_string(), serde_json::json!(next_id));
                next_id += 1;
            }
        }

        let added_tokens: Vec<serde_json::Value> = SPECIALS
            .iter()
            .map(|(token, id)| serde_json::json!({
                "id": id, "content": token, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": null,
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let tokenizer = Tokenizer::from_str(&tokenizer_json.to_string())
            .map_err(|e| anyhow::anyhow!("Cannot build word-level tokenizer: {e}"))?;

        tracing::debug!("Vocabulary built with {} entries", next_id);
        Ok(Self { tokenizer })
    }

    /// Wrap a loaded tokenizer after checking the sentinel ids.
    pub fn from_tokenizer(tokenizer: Tokenizer) -> Result<Self> {
        for (token, id) in SPECIALS {
            let found = tokenizer.token_to_id(token);
            ensure!(
                found == Some(id),
                "Tokenizer maps '{token}' to {found:?}, expected id {id}"
            );
        }
        Ok(Self { tokenizer })
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Number of ids, sentinels included
    pub fn len(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    /// Ids of the whitespace-separated subwords; unknown ones map to <unk>.
    pub fn encode(&self, sentence: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(sentence, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// `[sos] ids… [eos]`, truncated to `max_len` with eos kept last.
    pub fn encode_with_sentinels(&self, sentence: &str, max_len: usize) -> Result<Vec<u32>> {
        ensure!(max_len >= 2, "max_len must leave room for sos and eos (got {max_len})");
        let mut ids = Vec::with_capacity(max_len);
        ids.push(SOS_ID);
        ids.extend(self.encode(sentence)?.into_iter().take(max_len - 2));
        ids.push(EOS_ID);
        Ok(ids)
    }

    pub fn id_to_token(&self, id: u32) -> Option<String> {
        self.tokenizer.id_to_token(id)
    }

    /// Turn id sequences into whitespace-joined strings.
    ///
    /// pad and sos are skipped, each sequence stops at its first eos.
    /// With `unsplit`, BPE continuations ("Ver@@ such") are rejoined.
    pub fn idxs_to_sentences(&self, seqs: &[Vec<u32>], unsplit: bool) -> Vec<String> {
        seqs.iter()
            .map(|seq| {
                let tokens: Vec<String> = seq
                    .iter()
                    .take_while(|&&id| id != EOS_ID)
                    .filter(|&&id| id != PAD_ID && id != SOS_ID)
                    .map(|&id| self.id_to_token(id).unwrap_or_else(|| UNK_TOKEN.to_string()))
                    .collect();
                let sentence = tokens.join(" ");
                if unsplit {
                    let joined = sentence.replace(BPE_MARKER, "");
                    joined.strip_suffix("@@").map(str::to_string).unwrap_or(joined)
                } else {
                    sentence
                }
            })
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_words_assigns_ids_after_sentinels() {
        let vocab = Vocabulary::from_words(&["a", "b", "a", "<pad>"]).unwrap();
        assert_eq!(vocab.len(), 6);
        assert_eq!(vocab.encode("a b").unwrap(), vec![4, 5]);
        assert_eq!(vocab.id_to_token(EOS_ID).as_deref(), Some(EOS_TOKEN));
    }

    #[test]
    fn test_unknown_word_maps_to_unk() {
        let vocab = Vocabulary::from_words(&["a"]).unwrap();
        assert_eq!(vocab.encode("a zzz").unwrap(), vec![4, UNK_ID]);
    }

    #[test]
    fn test_build_ranks_by_frequency_then_lexicographic() {
        let vocab = Vocabulary::build(["c b a", "b c", "d"], 6).unwrap();
        // b and c both appear twice; b wins the tie. a and d are cut.
        assert_eq!(vocab.len(), 6);
        assert_eq!(vocab.encode("b c a").unwrap(), vec![4, 5, UNK_ID]);
    }

    #[test]
    fn test_sentinels_wrap_and_truncate() {
        let vocab = Vocabulary::from_words(&["a", "b", "c"]).unwrap();
        assert_eq!(vocab.encode_with_sentinels("a b c", 10).unwrap(), vec![2, 4, 5, 6, 3]);
        assert_eq!(vocab.encode_with_sentinels("a b c", 4).unwrap(), vec![2, 4, 5, 3]);
        assert!(vocab.encode_with_sentinels("a", 1).is_err());
    }

    #[test]
    fn test_idxs_to_sentences() {
        let vocab = Vocabulary::from_words(&["Ver@@", "such", "ist"]).unwrap();
        let seqs  = vec![vec![2, 4, 5, 6, 3, 6], vec![2, 6, 0, 0]];
        assert_eq!(
            vocab.idxs_to_sentences(&seqs, false),
            vec!["Ver@@ such ist".to_string(), "ist".to_string()]
        );
        assert_eq!(
            vocab.idxs_to_sentences(&seqs, true),
            vec!["Versuch ist".to_string(), "ist".to_string()]
        );
    }

    #[test]
    fn test_from_tokenizer_checks_sentinels() {
        let vocab  = Vocabulary::from_words(&["x"]).unwrap();
        let reread = Vocabulary::from_tokenizer(vocab.tokenizer().clone()).unwrap();
        assert_eq!(reread.encode("x").unwrap(), vec![4]);

        let bad = serde_json::json!({
            "version": "1.0", "truncation": null, "padding": null, "added_tokens": [],
            "normalizer": null, "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null, "decoder": null,
            "model": { "type": "WordLevel", "vocab": { "<unk>": 0, "<pad>": 1 }, "unk_token": "<unk>" }
        });
        let tokenizer = Tokenizer::from_str(&bad.to_string()).unwrap();
        assert!(Vocabulary::from_tokenizer(tokenizer).is_err());
    }
}
