// ============================================================
// Layer 5 — Model Factory
// ============================================================
// Turns a resolved ModelSpec into a ModelBlueprint: the burn
// config of the architecture to build plus where its pretrained
// weights live. Blueprints are backend-free, so the caller picks
// the backend when it calls `init_*`.
//
//   TextCnn / BiLstm / Rcnn → vocab size, class count, 300-d
//                             embeddings (optionally pretrained)
//   Bert / Gpt / Transformer → backbone dimensions from the local
//                             config.json or the published size,
//                             pooling by class, optional freezing

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::CompactRecorder,
};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::data::tokenizer::MAX_SEQ_LEN;
use crate::domain::model_spec::{Architecture, BackboneShape, ModelSpec, TokenizerFamily};
use crate::ml::backbone::{BackboneConfig, Pooling, PretrainedClassifier, PretrainedClassifierConfig};
use crate::ml::schedule::ScheduleKind;
use crate::ml::word_models::{BiLstmClassifierConfig, RcnnConfig, TextCnnConfig};

/// Learning rate of every word-level model.
pub const WORD_MODEL_LR: f64 = 1e-3;
/// Batch size of every word-level model.
pub const WORD_MODEL_BATCH_SIZE: usize = 64;

/// File name (without extension) of converted backbone weights.
const BACKBONE_WEIGHTS: &str = "backbone";

#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub spec:            &'a ModelSpec,
    pub num_classes:     usize,
    pub vocab_size:      usize,
    /// Pool the whole sequence instead of one token
    pub sequence:        bool,
    pub freeze_backbone: bool,
}

#[derive(Debug, Clone)]
pub enum ModelBlueprint {
    TextCnn(TextCnnConfig),
    BiLstm(BiLstmClassifierConfig),
    Rcnn(RcnnConfig),
    Pretrained {
        config:  PretrainedClassifierConfig,
        /// Base path of `backbone.mpk`, when present
        weights: Option<PathBuf>,
    },
}

/// Optimiser settings that depend on the model class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optimization {
    pub learning_rate: f64,
    pub batch_size:    usize,
    pub schedule:      ScheduleKind,
}

pub fn build_model(req: &ModelRequest<'_>) -> Result<ModelBlueprint> {
    let (vocab, classes) = (req.vocab_size, req.num_classes);
    let blueprint = match req.spec.architecture {
        Architecture::TextCnn => ModelBlueprint::TextCnn(TextCnnConfig::new(vocab, classes)),
        Architecture::BiLstm => ModelBlueprint::BiLstm(BiLstmClassifierConfig::new(vocab, classes)),
        Architecture::Rcnn => ModelBlueprint::Rcnn(RcnnConfig::new(vocab, classes)),
        Architecture::Bert | Architecture::Gpt | Architecture::Transformer => pretrained_blueprint(req)?,
    };
    tracing::info!("Model blueprint for '{}': {}", req.spec.name, blueprint.describe());
    Ok(blueprint)
}

fn pretrained_blueprint(req: &ModelRequest<'_>) -> Result<ModelBlueprint> {
    let spec = req.spec;
    let local_dir = spec.local.then(|| Path::new(&spec.source));

    let (shape, type_vocab_size) = match local_dir.map(|d| d.join("config.json")).filter(|p| p.exists()) {
        Some(path) => read_backbone_config(&path, spec)?,
        None => (spec.backbone_shape(), default_type_vocab(spec.family)),
    };

    let causal = spec.architecture == Architecture::Gpt;
    let pooling = match (req.sequence, spec.architecture, spec.family) {
        (true, _, _) | (_, Architecture::Transformer, _) => Pooling::Mean,
        (_, Architecture::Gpt, _) | (_, _, TokenizerFamily::XlNet) => Pooling::Last,
        _ => Pooling::First,
    };

    let backbone = BackboneConfig::new(
        req.vocab_size,
        shape.max_positions.max(MAX_SEQ_LEN),
        shape.hidden,
        shape.heads,
        shape.layers,
        shape.intermediate,
    )
    .with_type_vocab_size(type_vocab_size)
    .with_causal(causal);

    let config = PretrainedClassifierConfig::new(backbone, req.num_classes, pooling)
        .with_freeze_backbone(req.freeze_backbone);

    let weights = local_dir
        .map(|d| d.join(BACKBONE_WEIGHTS))
        .filter(|p| p.with_extension("mpk").exists());
    if weights.is_none() {
        tracing::warn!(
            "No converted backbone weights for '{}' ({}.mpk); the backbone starts from initialisation",
            spec.source,
            BACKBONE_WEIGHTS
        );
    }

    Ok(ModelBlueprint::Pretrained { config, weights })
}

fn default_type_vocab(family: TokenizerFamily) -> usize {
    if family.uses_segment_ids() { 2 } else { 0 }
}

/// Backbone dimensions from a hub-style `config.json`
/// (BERT, T5 and GPT-2 key spellings).
fn read_backbone_config(path: &Path, spec: &ModelSpec) -> Result<(BackboneShape, usize)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
    let json: Value = serde_json::from_str(&text)
        .with_context(|| format!("Malformed model config '{}'", path.display()))?;

    let published = spec.backbone_shape();
    let pick = |keys: &[&str], fallback: usize| {
        keys.iter()
            .find_map(|k| json.get(*k).and_then(Value::as_u64))
            .map_or(fallback, |v| v as usize)
    };

    let hidden = pick(&["hidden_size", "d_model", "n_embd"], published.hidden);
    let shape = BackboneShape {
        hidden,
        heads:         pick(&["num_attention_heads", "num_heads", "n_head"], published.heads),
        layers:        pick(&["num_hidden_layers", "num_layers", "n_layer"], published.layers),
        intermediate:  pick(&["intermediate_size", "d_ff", "d_inner", "n_inner"], 4 * hidden),
        max_positions: pick(&["max_position_embeddings", "n_positions"], published.max_positions),
    };
    let type_vocab_size = if spec.family.uses_segment_ids() {
        pick(&["type_vocab_size"], 2)
    } else {
        0
    };

    tracing::debug!("Backbone shape from '{}': {:?}", path.display(), shape);
    Ok((shape, type_vocab_size))
}

impl ModelBlueprint {
    pub fn is_word_level(&self) -> bool {
        !matches!(self, Self::Pretrained { .. })
    }

    pub fn optimization(&self, base_lr: f64, batch_size: usize) -> Optimization {
        if self.is_word_level() {
            Optimization {
                learning_rate: WORD_MODEL_LR,
                batch_size:    WORD_MODEL_BATCH_SIZE,
                schedule:      ScheduleKind::Constant,
            }
        } else {
            Optimization {
                learning_rate: base_lr,
                batch_size,
                schedule:      ScheduleKind::WarmupLinearDecay,
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::TextCnn(c) => format!("TextCNN(vocab={}, classes={})", c.vocab_size, c.num_classes),
            Self::BiLstm(c) => format!("BiLSTM(vocab={}, classes={})", c.vocab_size, c.num_classes),
            Self::Rcnn(c) => format!("RCNN(vocab={}, classes={})", c.vocab_size, c.num_classes),
            Self::Pretrained { config, .. } => format!(
                "Transformer(d_model={}, layers={}, heads={}, pooling={:?}, frozen={}, classes={})",
                config.backbone.d_model,
                config.backbone.num_layers,
                config.backbone.num_heads,
                config.pooling,
                config.freeze_backbone,
                config.num_classes
            ),
        }
    }
}

/// Build a pretrained-backbone classifier, restoring backbone
/// weights when the blueprint points at them.
pub fn init_pretrained<B: Backend>(
    config:  &PretrainedClassifierConfig,
    weights: Option<&Path>,
    device:  &B::Device,
) -> Result<PretrainedClassifier<B>> {
    let mut backbone = config.backbone.init::<B>(device);
    if let Some(path) = weights {
        backbone = backbone
            .load_file(path.to_path_buf(), &CompactRecorder::new(), device)
            .with_context(|| format!("Cannot load backbone weights '{}'", path.display()))?;
        tracing::info!("Backbone weights restored from '{}'", path.display());
    }
    Ok(config.init_with(backbone, device))
}
