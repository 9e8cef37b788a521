// ============================================================
// Layer 5 — Word-Level Architectures
// ============================================================
// Three classifiers over the trained word vocabulary, all
// starting from a 300-d embedding that may be seeded with
// GloVe / word2vec / fastText vectors:
//
//   TextCNN : embed → Conv1d k=3,4,5 ×100 → ReLU → max-pool
//             → dropout → linear
//   BiLSTM  : embed → BiLSTM(128) → masked mean → linear
//   RCNN    : embed → BiLSTM(128) ⊕ embed → linear + tanh
//             → max-pool → linear
//
// Reference: Kim (2014) CNNs for Sentence Classification
//            Lai et al. (2015) Recurrent CNNs for Text Classification

use burn::{
    module::Param,
    nn::{
        conv::{Conv1d, Conv1dConfig},
        BiLstm, BiLstmConfig, Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear,
        LinearConfig,
    },
    prelude::*,
    tensor::activation::{relu, tanh},
};

use crate::data::batcher::EncodedBatch;
use crate::infra::embeddings::EmbeddingMatrix;
use crate::ml::model::{masked_mean, max_over_time, IssueModel};

/// Embedding table, optionally overwritten with pretrained vectors.
fn init_embedding<B: Backend>(
    vocab_size: usize,
    embed_dim:  usize,
    pretrained: Option<&EmbeddingMatrix>,
    device:     &B::Device,
) -> Embedding<B> {
    let mut embedding = EmbeddingConfig::new(vocab_size, embed_dim).init(device);
    if let Some(m) = pretrained.filter(|m| m.vocab_size == vocab_size && m.dim == embed_dim) {
        let weight = Tensor::<B, 1>::from_floats(m.values.as_slice(), device).reshape([vocab_size, embed_dim]);
        embedding.weight = Param::from_tensor(weight);
    } else if pretrained.is_some() {
        tracing::warn!("Pretrained embedding shape does not match the vocabulary, ignoring it");
    }
    embedding
}

// ─── TextCNN ──────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct TextCnnConfig {
    pub vocab_size:  usize,
    pub num_classes: usize,
    #[config(default = 300)]
    pub embed_dim:   usize,
    #[config(default = 100)]
    pub num_filters: usize,
    #[config(default = "vec![3, 4, 5]")]
    pub kernel_sizes: Vec<usize>,
    #[config(default = 0.5)]
    pub dropout:     f64,
}

impl TextCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device, pretrained: Option<&EmbeddingMatrix>) -> TextCnn<B> {
        let convs = self
            .kernel_sizes
            .iter()
            .map(|&k| Conv1dConfig::new(self.embed_dim, self.num_filters, k).init(device))
            .collect();
        TextCnn {
            embedding: init_embedding(self.vocab_size, self.embed_dim, pretrained, device),
            convs,
            dropout: DropoutConfig::new(self.dropout).init(),
            output: LinearConfig::new(self.num_filters * self.kernel_sizes.len(), self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct TextCnn<B: Backend> {
    pub embedding: Embedding<B>,
    pub convs:     Vec<Conv1d<B>>,
    pub dropout:   Dropout,
    pub output:    Linear<B>,
}

impl<B: Backend> IssueModel<B> for TextCnn<B> {
    fn forward(&self, inputs: EncodedBatch<B>) -> Tensor<B, 2> {
        // Conv1d wants [batch, channels, length]
        let x = self.embedding.forward(inputs.input_ids).swap_dims(1, 2);
        let pooled: Vec<Tensor<B, 2>> = self
            .convs
            .iter()
            .map(|conv| relu(conv.forward(x.clone())).max_dim(2).squeeze::<2>(2))
            .collect();
        let features = Tensor::cat(pooled, 1);
        self.output.forward(self.dropout.forward(features))
    }
}

// ─── BiLSTM ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct BiLstmClassifierConfig {
    pub vocab_size:  usize,
    pub num_classes: usize,
    #[config(default = 300)]
    pub embed_dim:   usize,
    #[config(default = 128)]
    pub hidden_size: usize,
}

impl BiLstmClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device, pretrained: Option<&EmbeddingMatrix>) -> BiLstmClassifier<B> {
        BiLstmClassifier {
            embedding: init_embedding(self.vocab_size, self.embed_dim, pretrained, device),
            lstm: BiLstmConfig::new(self.embed_dim, self.hidden_size, true).init(device),
            output: LinearConfig::new(2 * self.hidden_size, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct BiLstmClassifier<B: Backend> {
    pub embedding: Embedding<B>,
    pub lstm:      BiLstm<B>,
    pub output:    Linear<B>,
}

impl<B: Backend> IssueModel<B> for BiLstmClassifier<B> {
    fn forward(&self, inputs: EncodedBatch<B>) -> Tensor<B, 2> {
        let x = self.embedding.forward(inputs.input_ids);
        let (states, _) = self.lstm.forward(x, None);
        self.output.forward(masked_mean(states, inputs.attention_mask))
    }
}

// ─── RCNN ─────────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct RcnnConfig {
    pub vocab_size:  usize,
    pub num_classes: usize,
    #[config(default = 300)]
    pub embed_dim:   usize,
    #[config(default = 128)]
    pub hidden_size: usize,
}

impl RcnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device, pretrained: Option<&EmbeddingMatrix>) -> Rcnn<B> {
        Rcnn {
            embedding: init_embedding(self.vocab_size, self.embed_dim, pretrained, device),
            lstm: BiLstmConfig::new(self.embed_dim, self.hidden_size, true).init(device),
            projection: LinearConfig::new(2 * self.hidden_size + self.embed_dim, self.hidden_size).init(device),
            output: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct Rcnn<B: Backend> {
    pub embedding:  Embedding<B>,
    pub lstm:       BiLstm<B>,
    pub projection: Linear<B>,
    pub output:     Linear<B>,
}

impl<B: Backend> IssueModel<B> for Rcnn<B> {
    fn forward(&self, inputs: EncodedBatch<B>) -> Tensor<B, 2> {
        let x = self.embedding.forward(inputs.input_ids);
        let (context, _) = self.lstm.forward(x.clone(), None);
        let y = tanh(self.projection.forward(Tensor::cat(vec![context, x], 2)));
        self.output.forward(max_over_time(y))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::encoded::EncodedText;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn batch(device: &<TestBackend as Backend>::Device) -> EncodedBatch<TestBackend> {
        let encodings = vec![
            EncodedText::new(vec![2, 3, 4, 5, 6, 7, 8, 9], None),
            EncodedText::new(vec![2, 3], None).padded(8, 0, crate::domain::encoded::PaddingSide::Right),
        ];
        EncodedBatch::stack(&encodings, device)
    }

    #[test]
    fn test_textcnn_logit_shape() {
        let device = Default::default();
        let model = TextCnnConfig::new(10, 3).with_embed_dim(16).with_num_filters(4).init::<TestBackend>(&device, None);
        assert_eq!(model.forward(batch(&device)).dims(), [2, 3]);
    }

    #[test]
    fn test_bilstm_logit_shape() {
        let device = Default::default();
        let model = BiLstmClassifierConfig::new(10, 4)
            .with_embed_dim(16)
            .with_hidden_size(8)
            .init::<TestBackend>(&device, None);
        assert_eq!(model.forward(batch(&device)).dims(), [2, 4]);
    }

    #[test]
    fn test_rcnn_logit_shape() {
        let device = Default::default();
        let model = RcnnConfig::new(10, 2).with_embed_dim(16).with_hidden_size(8).init::<TestBackend>(&device, None);
        assert_eq!(model.forward(batch(&device)).dims(), [2, 2]);
    }

    #[test]
    fn test_pretrained_rows_are_loaded() {
        let device = Default::default();
        let matrix = EmbeddingMatrix {
            vocab_size: 3,
            dim:        2,
            values:     vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0],
            found:      2,
        };
        let embedding = init_embedding::<TestBackend>(3, 2, Some(&matrix), &device);
        let weight: Vec<f32> = embedding.weight.val().into_data().to_vec().unwrap();
        assert_eq!(weight, matrix.values);
    }
}
