// ============================================================
// Layer 3 — Model Registry
// ============================================================
// Maps every recognised model name onto:
//   - the architecture the model factory builds, and
//   - the tokenizer family whose conventions (pad token,
//     separator, segment ids, padding side) apply to it.
//
// The tokenizer CLASS (word vocabulary / pretrained encoder /
// pretrained decoder) follows from the architecture. Names
// outside the table are rejected before any data is touched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::encoded::PaddingSide;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown model '{name}'")]
    UnknownModel { name: String },
}

/// The six architectures the factory can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    TextCnn,
    BiLstm,
    Rcnn,
    /// Pretrained encoder backbone (BERT, RoBERTa, XLNet, ...)
    Bert,
    /// Pretrained decoder backbone (GPT-2 style)
    Gpt,
    /// Encoder of a pretrained encoder-decoder (T5 style)
    Transformer,
}

impl Architecture {
    pub fn tokenizer_class(self) -> TokenizerClass {
        match self {
            Self::TextCnn | Self::BiLstm | Self::Rcnn => TokenizerClass::WordVocabulary,
            Self::Bert | Self::Transformer => TokenizerClass::PretrainedEncoder,
            Self::Gpt => TokenizerClass::PretrainedDecoder,
        }
    }

    pub fn is_word_level(self) -> bool {
        self.tokenizer_class() == TokenizerClass::WordVocabulary
    }
}

/// The three mutually exclusive tokenization strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerClass {
    /// Vocabulary trained on the training partition
    WordVocabulary,
    /// Pretrained subword tokenizer used as published
    PretrainedEncoder,
    /// Pretrained subword tokenizer with pad remapped to end-of-sequence
    PretrainedDecoder,
}

/// Special-token conventions of each pretrained tokenizer family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenizerFamily {
    WordLevel,
    Bert,
    Roberta,
    Albert,
    XlNet,
    T5,
    Gpt2,
    /// Loaded through the generic auto-tokenizer path (WordPiece vocab)
    Auto,
}

impl TokenizerFamily {
    /// Native padding token, if the family defines one.
    pub fn pad_token(self) -> Option<&'static str> {
        match self {
            Self::WordLevel => Some(crate::domain::encoded::WORD_PADDING_TOKEN),
            Self::Bert | Self::Auto => Some("[PAD]"),
            Self::Roberta | Self::Albert | Self::XlNet | Self::T5 => Some("<pad>"),
            Self::Gpt2 => None,
        }
    }

    pub fn eos_token(self) -> Option<&'static str> {
        match self {
            Self::Roberta | Self::XlNet | Self::T5 => Some("</s>"),
            Self::Gpt2 => Some("<|endoftext|>"),
            Self::WordLevel | Self::Bert | Self::Auto | Self::Albert => None,
        }
    }

    /// Token placed between text segments when composing an issue.
    pub fn separator(self) -> Option<&'static str> {
        match self {
            Self::Bert | Self::Auto | Self::Albert => Some("[SEP]"),
            Self::Roberta => Some("</s>"),
            Self::XlNet => Some("<sep>"),
            Self::WordLevel | Self::T5 | Self::Gpt2 => None,
        }
    }

    /// Whether the model consumes token-type (segment) ids.
    pub fn uses_segment_ids(self) -> bool {
        matches!(self, Self::Bert | Self::Auto | Self::Albert | Self::XlNet)
    }

    pub fn native_padding_side(self) -> PaddingSide {
        match self {
            Self::XlNet => PaddingSide::Left,
            _ => PaddingSide::Right,
        }
    }
}

const REGISTRY: &[(&str, Architecture, TokenizerFamily)] = &[
    ("textcnn", Architecture::TextCnn, TokenizerFamily::WordLevel),
    ("bilstm", Architecture::BiLstm, TokenizerFamily::WordLevel),
    ("rcnn", Architecture::Rcnn, TokenizerFamily::WordLevel),
    ("bert-base-uncased", Architecture::Bert, TokenizerFamily::Bert),
    ("xlnet-base-cased", Architecture::Bert, TokenizerFamily::XlNet),
    ("albert-base-v2", Architecture::Bert, TokenizerFamily::Albert),
    ("roberta-base", Architecture::Bert, TokenizerFamily::Roberta),
    ("microsoft/codebert-base", Architecture::Bert, TokenizerFamily::Roberta),
    ("codebert-base", Architecture::Bert, TokenizerFamily::Roberta),
    ("jeniya/BERTOverflow", Architecture::Bert, TokenizerFamily::Auto),
    ("BERTOverflow", Architecture::Bert, TokenizerFamily::Auto),
    ("huggingface/CodeBERTa-language-id", Architecture::Bert, TokenizerFamily::Roberta),
    ("seBERT", Architecture::Bert, TokenizerFamily::Bert),
    ("t5-base", Architecture::Transformer, TokenizerFamily::T5),
    ("t5-large", Architecture::Transformer, TokenizerFamily::T5),
    ("Salesforce/codet5-base", Architecture::Transformer, TokenizerFamily::Roberta),
    ("codet5-base", Architecture::Transformer, TokenizerFamily::Roberta),
    ("gpt2", Architecture::Gpt, TokenizerFamily::Gpt2),
    ("microsoft/CodeGPT-small-py", Architecture::Gpt, TokenizerFamily::Gpt2),
    ("CodeGPT-small-py", Architecture::Gpt, TokenizerFamily::Gpt2),
];

/// Published dimensions of a pretrained backbone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackboneShape {
    pub hidden:        usize,
    pub heads:         usize,
    pub layers:        usize,
    pub intermediate:  usize,
    pub max_positions: usize,
}

impl BackboneShape {
    pub const BASE: Self = Self {
        hidden: 768, heads: 12, layers: 12, intermediate: 3072, max_positions: 512,
    };

    pub fn published(name: &str) -> Self {
        match name {
            "t5-large" => Self {
                hidden: 1024, heads: 16, layers: 24, intermediate: 4096, max_positions: 512,
            },
            "huggingface/CodeBERTa-language-id" => Self { layers: 6, ..Self::BASE },
            "gpt2" | "microsoft/CodeGPT-small-py" | "CodeGPT-small-py" => Self {
                max_positions: 1024,
                ..Self::BASE
            },
            _ => Self::BASE,
        }
    }
}

/// A resolved `--model` argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Registry key (last path component for local models)
    pub name: String,
    /// What to load from: the canonical identifier or the local path
    pub source: String,
    pub local: bool,
    pub architecture: Architecture,
    pub family: TokenizerFamily,
}

impl ModelSpec {
    /// Resolve a model argument against the registry.
    pub fn resolve(model: &str, local: bool) -> Result<Self, ConfigError> {
        let name = if local {
            model
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(model)
        } else {
            model
        };

        let (_, architecture, family) = REGISTRY
            .iter()
            .find(|(key, _, _)| *key == name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownModel { name: model.to_string() })?;

        Ok(Self {
            name: name.to_string(),
            source: model.to_string(),
            local,
            architecture,
            family,
        })
    }

    pub fn tokenizer_class(&self) -> TokenizerClass {
        self.architecture.tokenizer_class()
    }

    pub fn backbone_shape(&self) -> BackboneShape {
        BackboneShape::published(&self.name)
    }
}

/// Replace `-` and `/` with `_` for use inside file names.
pub fn sanitize(name: &str) -> String {
    name.replace('-', "_").replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_level_names() {
        for name in ["textcnn", "bilstm", "rcnn"] {
            let spec = ModelSpec::resolve(name, false).unwrap();
            assert_eq!(spec.tokenizer_class(), TokenizerClass::WordVocabulary);
        }
    }

    #[test]
    fn test_encoder_decoder_is_tokenized_as_encoder() {
        let spec = ModelSpec::resolve("t5-base", false).unwrap();
        assert_eq!(spec.architecture, Architecture::Transformer);
        assert_eq!(spec.tokenizer_class(), TokenizerClass::PretrainedEncoder);
    }

    #[test]
    fn test_decoder_class() {
        let spec = ModelSpec::resolve("microsoft/CodeGPT-small-py", false).unwrap();
        assert_eq!(spec.tokenizer_class(), TokenizerClass::PretrainedDecoder);
        assert_eq!(spec.family.pad_token(), None);
        assert_eq!(spec.family.eos_token(), Some("<|endoftext|>"));
    }

    #[test]
    fn test_local_model_uses_last_path_component() {
        let spec = ModelSpec::resolve("/models/roberta-base/", true).unwrap();
        assert_eq!(spec.name, "roberta-base");
        assert_eq!(spec.source, "/models/roberta-base/");
        assert!(spec.local);
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let err = ModelSpec::resolve("resnet50", false).unwrap_err();
        assert_eq!(err, ConfigError::UnknownModel { name: "resnet50".into() });
    }

    #[test]
    fn test_xlnet_pads_left() {
        assert_eq!(TokenizerFamily::XlNet.native_padding_side(), PaddingSide::Left);
        assert_eq!(TokenizerFamily::Bert.native_padding_side(), PaddingSide::Right);
    }
}
