// ============================================================
// Layer 4 — Issue Tokenizer
// ============================================================
// One capability, three strategies: every model class encodes
// text through `IssueTokenizer`, which wraps a HuggingFace
// `tokenizers::Tokenizer` plus the conventions of its class:
//
//   WordVocabulary    → WordLevel vocab counted over the train
//                       file, lower-cased, min length 8
//   PretrainedEncoder → published subword tokenizer, family pad
//                       token and padding side
//   PretrainedDecoder → published subword tokenizer, pad token
//                       remapped to end-of-sequence, right padded
//
// Sequences are truncated to MAX_SEQ_LEN by the inner tokenizer
// and padded here.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use tokenizers::{Tokenizer, TruncationParams};

use crate::data::composer::compose_issue_text;
use crate::domain::encoded::{EncodedText, PaddingSide};
use crate::domain::issue::Issue;
use crate::domain::model_spec::{TokenizerClass, TokenizerFamily};

/// Longest sequence any model receives.
pub const MAX_SEQ_LEN: usize = 512;

/// Shortest padded sequence for word-vocabulary models (widest CNN kernel fits).
pub const WORD_MIN_PADDING: usize = 8;

pub struct IssueTokenizer {
    class:        TokenizerClass,
    family:       TokenizerFamily,
    inner:        Tokenizer,
    lowercase:    bool,
    pad_token:    String,
    pad_id:       u32,
    padding_side: PaddingSide,
    min_len:      usize,
}

impl IssueTokenizer {
    pub fn new(
        class:     TokenizerClass,
        family:    TokenizerFamily,
        mut inner: Tokenizer,
        lowercase: bool,
    ) -> Result<Self> {
        let pad_token = match class {
            // decoders have no native pad token
            TokenizerClass::PretrainedDecoder => family.eos_token().map(str::to_string),
            _ => inner
                .get_padding()
                .map(|p| p.pad_token.clone())
                .or_else(|| family.pad_token().map(str::to_string)),
        }
        .ok_or_else(|| anyhow!("No padding token known for the {family:?} tokenizer family"))?;

        let pad_id = inner
            .token_to_id(&pad_token)
            .ok_or_else(|| anyhow!("Padding token '{pad_token}' is not in the vocabulary"))?;

        let padding_side = match class {
            TokenizerClass::PretrainedDecoder => PaddingSide::Right,
            _ => family.native_padding_side(),
        };

        let min_len = match class {
            TokenizerClass::WordVocabulary => WORD_MIN_PADDING,
            _ => 1,
        };

        inner
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Cannot configure truncation: {e}"))?;
        inner.with_padding(None);

        tracing::debug!(
            "Tokenizer ready: {:?}/{:?}, pad='{}' ({}), side={:?}",
            class, family, pad_token, pad_id, padding_side
        );

        Ok(Self { class, family, inner, lowercase, pad_token, pad_id, padding_side, min_len })
    }

    pub fn pad_token(&self) -> &str {
        &self.pad_token
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    pub fn padding_side(&self) -> PaddingSide {
        self.padding_side
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    pub fn uses_segment_ids(&self) -> bool {
        self.family.uses_segment_ids()
    }

    /// Size of the id space including special tokens (highest id + 1).
    pub fn vocab_size(&self) -> usize {
        self.inner
            .get_vocab(true)
            .values()
            .copied()
            .max()
            .map_or(0, |id| id as usize + 1)
    }

    /// Token → id map, special tokens included.
    pub fn vocabulary(&self) -> HashMap<String, u32> {
        self.inner.get_vocab(true)
    }

    /// The evaluation string of an issue, joined with this family's separator.
    pub fn compose(&self, issue: &Issue) -> String {
        compose_issue_text(issue, self.family.separator())
    }

    /// Tokenise and truncate, without padding.
    pub fn encode(&self, text: &str) -> Result<EncodedText> {
        let encoding = if self.lowercase {
            self.inner.encode(text.to_lowercase(), true)
        } else {
            self.inner.encode(text, true)
        }
        .map_err(|e| anyhow!("Tokenisation error: {e}"))?;

        let type_ids = self
            .uses_segment_ids()
            .then(|| encoding.get_type_ids().to_vec());
        Ok(EncodedText::new(encoding.get_ids().to_vec(), type_ids))
    }

    /// Pad to `target` tokens, never below this tokenizer's minimum.
    pub fn pad(&self, encoded: EncodedText, target: usize) -> EncodedText {
        encoded.padded(target.max(self.min_len), self.pad_id, self.padding_side)
    }

    /// Tokenise, truncate, and pad to exactly `len` tokens.
    pub fn encode_padded(&self, text: &str, len: usize) -> Result<EncodedText> {
        let encoded = self.encode(text)?;
        Ok(self.pad(encoded, len))
    }
}

impl std::fmt::Debug for IssueTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueTokenizer")
            .field("class", &self.class)
            .field("family", &self.family)
            .field("pad_token", &self.pad_token)
            .field("padding_side", &self.padding_side)
            .field("vocab_size", &self.vocab_size())
            .finish()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::word_level_tokenizer;

    fn word_tokenizer() -> IssueTokenizer {
        let vocab = vec!["crash".to_string(), "on".to_string(), "start".to_string()];
        let inner = word_level_tokenizer(&vocab).unwrap();
        IssueTokenizer::new(TokenizerClass::WordVocabulary, TokenizerFamily::WordLevel, inner, true)
            .unwrap()
    }

    #[test]
    fn test_word_tokenizer_special_ids() {
        let tok = word_tokenizer();
        assert_eq!(tok.pad_id(), 0);
        assert_eq!(tok.pad_token(), "@@PADDING@@");
        assert_eq!(tok.vocab_size(), 5);
    }

    #[test]
    fn test_lowercases_and_maps_unknown() {
        let tok = word_tokenizer();
        let e = tok.encode("Crash ON boot").unwrap();
        assert_eq!(e.input_ids, vec![2, 3, 1]);
        assert!(e.type_ids.is_none());
    }

    #[test]
    fn test_word_padding_never_below_minimum() {
        let tok = word_tokenizer();
        let short = tok.pad(tok.encode("crash").unwrap(), 3);
        assert_eq!(short.len(), WORD_MIN_PADDING);
        assert_eq!(short.attention_mask, vec![1, 0, 0, 0, 0, 0, 0, 0]);

        let long = tok.encode_padded("crash on start", 0).unwrap();
        assert_eq!(long.input_ids, vec![2, 3, 4, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_fixed_padding() {
        let tok = word_tokenizer();
        let e = tok.encode_padded("crash on start", 20).unwrap();
        assert_eq!(e.len(), 20);
        assert_eq!(e.input_ids[3..], [0; 17]);
    }

    #[test]
    fn test_truncates_to_max_len() {
        let tok = word_tokenizer();
        let long = vec!["crash"; MAX_SEQ_LEN + 40].join(" ");
        let e = tok.encode_padded(&long, MAX_SEQ_LEN).unwrap();
        assert_eq!(e.len(), MAX_SEQ_LEN);
        assert!(e.attention_mask.iter().all(|&m| m == 1));
    }

    #[test]
    fn test_decoder_pads_with_eos_on_the_right() {
        let vocab = vec!["<|endoftext|>".to_string(), "hello".to_string()];
        let inner = word_level_tokenizer(&vocab).unwrap();
        let tok = IssueTokenizer::new(
            TokenizerClass::PretrainedDecoder,
            TokenizerFamily::Gpt2,
            inner,
            false,
        )
        .unwrap();

        assert_eq!(tok.pad_token(), "<|endoftext|>");
        assert_eq!(Some(tok.pad_token()), TokenizerFamily::Gpt2.eos_token());
        assert_eq!(tok.padding_side(), PaddingSide::Right);

        let e = tok.encode_padded("hello", 3).unwrap();
        assert_eq!(e.input_ids, vec![3, 2, 2]);
        assert_eq!(e.attention_mask, vec![1, 0, 0]);
    }

    #[test]
    fn test_missing_pad_token_is_an_error() {
        let inner = word_level_tokenizer(&["hello".to_string()]).unwrap();
        let result = IssueTokenizer::new(
            TokenizerClass::PretrainedDecoder,
            TokenizerFamily::Gpt2,
            inner,
            false,
        );
        assert!(result.is_err());
    }
}
