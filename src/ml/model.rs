// ============================================================
// Layer 5 — Model Contract
// ============================================================
// Every architecture (word-level or pretrained backbone) is a
// Burn module that maps an EncodedBatch to one logit vector per
// issue. The trainer and the inferencer are generic over this
// trait, so they never need to know which model they drive.

use burn::{nn::loss::CrossEntropyLossConfig, prelude::*, train::ClassificationOutput};

use crate::data::batcher::{EncodedBatch, IssueBatch};

pub trait IssueModel<B: Backend> {
    /// [batch, seq] inputs → [batch, num_classes] logits
    fn forward(&self, inputs: EncodedBatch<B>) -> Tensor<B, 2>;

    /// Logits plus cross-entropy loss against the batch labels.
    fn forward_classification(&self, batch: IssueBatch<B>) -> ClassificationOutput<B> {
        let logits = self.forward(batch.inputs);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), batch.labels.clone());
        ClassificationOutput::new(loss, logits, batch.labels)
    }
}

/// Float [batch, seq, 1] copy of the attention mask, for masked pooling.
pub fn float_mask<B: Backend>(attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 3> {
    attention_mask.float().unsqueeze_dim::<3>(2)
}

/// Mean over the non-padding positions of `x` ([batch, seq, d] → [batch, d]).
pub fn masked_mean<B: Backend>(x: Tensor<B, 3>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
    let mask = float_mask(attention_mask);
    let summed = (x * mask.clone()).sum_dim(1).squeeze::<2>(1);
    let counts = mask.sum_dim(1).squeeze::<2>(1).clamp_min(1.0);
    summed / counts
}

/// Max over the sequence axis ([batch, seq, d] → [batch, d]).
pub fn max_over_time<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 2> {
    x.max_dim(1).squeeze::<2>(1)
}
