// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Selects the tokenizer for a resolved model:
//
//   word-level models  → WordLevel vocabulary counted over the
//                        whole train file, written to
//                        <dir>/tokenizer.json and loaded back
//   local pretrained   → <model path>/tokenizer.json, lower-cased
//   remote pretrained  → Tokenizer::from_pretrained(identifier)
//
// The WordLevel JSON is written by hand rather than trained
// through the tokenizers trainer API, so ids are fully under
// our control: @@PADDING@@ = 0, @@UNKNOWN@@ = 1, then tokens by
// descending frequency, ties broken lexicographically.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokenizers::Tokenizer;

use crate::data::tokenizer::IssueTokenizer;
use crate::domain::encoded::{WORD_PADDING_TOKEN, WORD_UNKNOWN_TOKEN};
use crate::domain::issue::Issue;
use crate::domain::model_spec::{ModelSpec, TokenizerClass};

/// Same pattern as the `Whitespace` pre-tokenizer of the WordLevel model.
const WORD_PATTERN: &str = r"\w+|[^\w\s]+";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Pick and load the tokenizer strategy for `spec`. Word
    /// vocabularies are counted over `corpus`, the whole train file.
    pub fn select(&self, spec: &ModelSpec, corpus: &[Issue]) -> Result<IssueTokenizer> {
        let class = spec.tokenizer_class();
        let (inner, lowercase) = match class {
            TokenizerClass::WordVocabulary => {
                let vocab = build_vocabulary(corpus)?;
                tracing::info!("Word vocabulary: {} tokens from {} issues", vocab.len(), corpus.len());
                (self.build_and_save(&vocab)?, true)
            }
            TokenizerClass::PretrainedEncoder | TokenizerClass::PretrainedDecoder => {
                if spec.local {
                    (load_local(Path::new(&spec.source))?, true)
                } else {
                    tracing::info!("Fetching tokenizer '{}'", spec.source);
                    let tok = Tokenizer::from_pretrained(&spec.source, None).map_err(|e| {
                        anyhow!("Cannot fetch tokenizer '{}': {}", spec.source, e)
                    })?;
                    (tok, false)
                }
            }
        };

        IssueTokenizer::new(class, spec.family, inner, lowercase)
    }

    /// Write the WordLevel tokenizer JSON for `vocab` and load it back.
    fn build_and_save(&self, vocab: &[String]) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let tok_path = self.dir.join("tokenizer.json");
        std::fs::write(&tok_path, serde_json::to_string_pretty(&word_level_json(vocab))?)
            .with_context(|| format!("Cannot write '{}'", tok_path.display()))?;
        tracing::debug!("Word vocabulary saved to '{}'", tok_path.display());

        Tokenizer::from_file(&tok_path)
            .map_err(|e| anyhow!("Cannot reload tokenizer '{}': {}", tok_path.display(), e))
    }
}

fn load_local(model_dir: &Path) -> Result<Tokenizer> {
    let path = model_dir.join("tokenizer.json");
    tracing::info!("Loading tokenizer from '{}'", path.display());
    Tokenizer::from_file(&path)
        .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
}

/// Tokens of `title + " " + description` over `corpus`,
/// most frequent first.
pub fn build_vocabulary(corpus: &[Issue]) -> Result<Vec<String>> {
    let word = Regex::new(WORD_PATTERN)?;
    let mut freq: HashMap<String, usize> = HashMap::new();

    for issue in corpus {
        let text = format!("{} {}", issue.title, issue.description).to_lowercase();
        for m in word.find_iter(&text) {
            *freq.entry(m.as_str().to_string()).or_insert(0) += 1;
        }
    }
    freq.remove(WORD_PADDING_TOKEN);
    freq.remove(WORD_UNKNOWN_TOKEN);

    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(words.into_iter().map(|(w, _)| w).collect())
}

/// In-memory WordLevel tokenizer over `vocab` (ids start at 2).
pub fn word_level_tokenizer(vocab: &[String]) -> Result<Tokenizer> {
    Tokenizer::from_str(&word_level_json(vocab).to_string())
        .map_err(|e| anyhow!("Cannot build word-level tokenizer: {e}"))
}

fn word_level_json(vocab: &[String]) -> serde_json::Value {
    let mut ids = serde_json::Map::new();
    ids.insert(WORD_PADDING_TOKEN.to_string(), serde_json::json!(0));
    ids.insert(WORD_UNKNOWN_TOKEN.to_string(), serde_json::json!(1));
    for word in vocab {
        if !ids.contains_key(word) {
            let next = ids.len();
            ids.insert(word.clone(), serde_json::json!(next));
        }
    }

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": ids,
            "unk_token": WORD_UNKNOWN_TOKEN
        }
    })
}
