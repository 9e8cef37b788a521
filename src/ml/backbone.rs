// ============================================================
// Layer 5 — Pretrained-Backbone Classifier
// ============================================================
// Transformer encoder stack with a classification head, used for
// every hub model (BERT / RoBERTa / XLNet / T5 / GPT-2 families):
//
//   token + position (+ segment) embeddings
//       → N × EncoderBlock (self-attention, GELU FFN, post-norm)
//       → final LayerNorm → pooling → dropout → linear
//
// Pooling depends on the model class:
//   First : first token (encoder, [CLS]-style)
//   Last  : last non-padding token (decoder, causal attention;
//           also left-padded XLNet)
//   Mean  : masked mean (encoder-decoder, or --sequence)
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

use burn::{
    module::Ignored,
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig, Linear,
        LinearConfig,
    },
    prelude::*,
    tensor::activation::gelu,
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::EncodedBatch;
use crate::ml::model::{masked_mean, IssueModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pooling {
    First,
    Last,
    Mean,
}

// ─── Backbone ─────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct BackboneConfig {
    pub vocab_size:    usize,
    pub max_positions: usize,
    pub d_model:       usize,
    pub num_heads:     usize,
    pub num_layers:    usize,
    pub d_ff:          usize,
    /// Segment vocabulary; 0 disables segment embeddings
    #[config(default = 0)]
    pub type_vocab_size: usize,
    /// Causal self-attention (decoder models)
    #[config(default = false)]
    pub causal:        bool,
    #[config(default = 0.1)]
    pub dropout:       f64,
}

impl BackboneConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Backbone<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_positions, self.d_model).init(device);
        let segment_embedding  = (self.type_vocab_size > 0)
            .then(|| EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device));
        let layers = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        Backbone {
            token_embedding,
            position_embedding,
            segment_embedding,
            layers,
            final_norm: LayerNormConfig::new(self.d_model).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            causal:     self.causal,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device),
            ffn_in:  LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_out: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:   LayerNormConfig::new(self.d_model).init(device),
            norm2:   LayerNormConfig::new(self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn: MultiHeadAttention<B>,
    pub ffn_in:    Linear<B>,
    pub ffn_out:   Linear<B>,
    pub norm1:     LayerNorm<B>,
    pub norm2:     LayerNorm<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>, mask_attn: Option<Tensor<B, 3, Bool>>) -> Tensor<B, 3> {
        let mut input = MhaInput::self_attn(x.clone()).mask_pad(mask_pad);
        if let Some(mask) = mask_attn {
            input = input.mask_attn(mask);
        }
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn = self.ffn_out.forward(gelu(self.ffn_in.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn))
    }
}

#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub segment_embedding:  Option<Embedding<B>>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub dropout:            Dropout,
    pub causal:             bool,
}

impl<B: Backend> Backbone<B> {
    /// [batch, seq] → hidden states [batch, seq, d_model]
    pub fn forward(&self, inputs: &EncodedBatch<B>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = inputs.input_ids.dims();
        let device = inputs.input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);

        let mut x = self.token_embedding.forward(inputs.input_ids.clone())
            + self.position_embedding.forward(positions);
        if let (Some(segments), Some(type_ids)) = (&self.segment_embedding, &inputs.token_type_ids) {
            x = x + segments.forward(type_ids.clone());
        }
        let mut x = self.dropout.forward(x);

        let mask_pad = inputs.attention_mask.clone().equal_elem(0);
        let mask_attn = self
            .causal
            .then(|| generate_autoregressive_mask::<B>(batch_size, seq_len, &device));

        for layer in &self.layers {
            x = layer.forward(x, mask_pad.clone(), mask_attn.clone());
        }
        self.final_norm.forward(x)
    }
}

// ─── PretrainedClassifier ─────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct PretrainedClassifierConfig {
    pub backbone:    BackboneConfig,
    pub num_classes: usize,
    pub pooling:     Pooling,
    /// Keep backbone weights fixed (only the head trains)
    #[config(default = false)]
    pub freeze_backbone: bool,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl PretrainedClassifierConfig {
    /// Attach a head to an already built (or restored) backbone.
    pub fn init_with<B: Backend>(&self, backbone: Backbone<B>, device: &B::Device) -> PretrainedClassifier<B> {
        let backbone = if self.freeze_backbone { backbone.no_grad() } else { backbone };
        PretrainedClassifier {
            backbone,
            pooling: Ignored(self.pooling),
            dropout: DropoutConfig::new(self.dropout).init(),
            head:    LinearConfig::new(self.backbone.d_model, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct PretrainedClassifier<B: Backend> {
    pub backbone: Backbone<B>,
    pub pooling:  Ignored<Pooling>,
    pub dropout:  Dropout,
    pub head:     Linear<B>,
}

impl<B: Backend> PretrainedClassifier<B> {
    fn pool(&self, hidden: Tensor<B, 3>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, seq_len, d_model] = hidden.dims();
        match self.pooling.0 {
            Pooling::First => hidden.slice([0..batch_size, 0..1, 0..d_model]).squeeze::<2>(1),
            Pooling::Mean => masked_mean(hidden, attention_mask),
            Pooling::Last => {
                // highest position holding a real token, whichever side was padded
                let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &hidden.device())
                    .unsqueeze::<2>()
                    .expand([batch_size, seq_len]);
                let last = (positions * attention_mask)
                    .argmax(1)
                    .reshape([batch_size, 1, 1])
                    .expand([batch_size, 1, d_model]);
                hidden.gather(1, last).squeeze::<2>(1)
            }
        }
    }
}

impl<B: Backend> IssueModel<B> for PretrainedClassifier<B> {
    fn forward(&self, inputs: EncodedBatch<B>) -> Tensor<B, 2> {
        let hidden = self.backbone.forward(&inputs);
        let pooled = self.pool(hidden, inputs.attention_mask);
        self.head.forward(self.dropout.forward(pooled))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::encoded::{EncodedText, PaddingSide};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny(causal: bool, type_vocab_size: usize) -> BackboneConfig {
        BackboneConfig::new(20, 16, 8, 2, 1, 16)
            .with_causal(causal)
            .with_type_vocab_size(type_vocab_size)
            .with_dropout(0.0)
    }

    fn batch(side: PaddingSide, with_types: bool) -> EncodedBatch<TestBackend> {
        let types = |n: usize| with_types.then(|| vec![0; n]);
        let encodings = vec![
            EncodedText::new(vec![3, 4, 5, 6], types(4)),
            EncodedText::new(vec![3, 4], types(2)).padded(4, 0, side),
        ];
        EncodedBatch::stack(&encodings, &Default::default())
    }

    fn build(
        config: PretrainedClassifierConfig,
        device: &<TestBackend as Backend>::Device,
    ) -> PretrainedClassifier<TestBackend> {
        config.init_with(config.backbone.init::<TestBackend>(device), device)
    }

    #[test]
    fn test_every_pooling_yields_class_logits() {
        let device = Default::default();
        for pooling in [Pooling::First, Pooling::Last, Pooling::Mean] {
            let model = build(PretrainedClassifierConfig::new(tiny(pooling == Pooling::Last, 0), 3, pooling), &device);
            assert_eq!(model.forward(batch(PaddingSide::Right, false)).dims(), [2, 3]);
        }
    }

    #[test]
    fn test_segment_ids_are_consumed() {
        let device = Default::default();
        let model = build(PretrainedClassifierConfig::new(tiny(false, 2), 2, Pooling::First), &device);
        assert_eq!(model.forward(batch(PaddingSide::Left, true)).dims(), [2, 2]);
    }

    #[test]
    fn test_last_pooling_picks_last_real_token() {
        let device = Default::default();
        let model = build(PretrainedClassifierConfig::new(tiny(true, 0), 2, Pooling::Last), &device);
        let inputs = batch(PaddingSide::Right, false);
        let hidden = model.backbone.forward(&inputs);

        let pooled: Vec<f32> = model.pool(hidden.clone(), inputs.attention_mask).into_data().to_vec().unwrap();
        let second_row_pos1: Vec<f32> = hidden.slice([1..2, 1..2, 0..8]).into_data().to_vec().unwrap();
        assert_eq!(&pooled[8..], second_row_pos1.as_slice());
    }
}
