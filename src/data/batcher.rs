// ============================================================
// Layer 4 — Issue Batcher
// ============================================================
// Implements Burn's Batcher trait: pads a Vec<IssueItem> to the
// longest encoding of the batch (never below the tokenizer's
// minimum) and stacks it into [batch, seq] tensors.
//
//   [s1_t1, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]
//
// EncodedBatch is also what the inferencer builds for each
// fixed-length micro-batch, so training and prediction feed the
// models the same input type.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::IssueItem;
use crate::data::tokenizer::IssueTokenizer;
use crate::domain::encoded::{EncodedText, PaddingSide};

// ─── EncodedBatch ─────────────────────────────────────────────────────────────
/// Model inputs for a batch of equally long encodings.
#[derive(Debug, Clone)]
pub struct EncodedBatch<B: Backend> {
    /// [batch_size, seq_len]
    pub input_ids:      Tensor<B, 2, Int>,
    /// [batch_size, seq_len], 1 = real token
    pub attention_mask: Tensor<B, 2, Int>,
    /// [batch_size, seq_len], only for families with segment ids
    pub token_type_ids: Option<Tensor<B, 2, Int>>,
}

impl<B: Backend> EncodedBatch<B> {
    /// Stack encodings that already share one length.
    pub fn stack(encodings: &[EncodedText], device: &B::Device) -> Self {
        let batch_size = encodings.len();
        let seq_len = encodings.first().map_or(0, EncodedText::len);

        let input_ids = stack_rows(encodings.iter().map(|e| e.input_ids.as_slice()), batch_size, seq_len, device);
        let attention_mask =
            stack_rows(encodings.iter().map(|e| e.attention_mask.as_slice()), batch_size, seq_len, device);

        let token_type_ids = encodings
            .iter()
            .map(|e| e.type_ids.as_deref())
            .collect::<Option<Vec<_>>>()
            .filter(|_| batch_size > 0)
            .map(|rows| stack_rows(rows.into_iter(), batch_size, seq_len, device));

        Self { input_ids, attention_mask, token_type_ids }
    }
}

fn stack_rows<'a, B: Backend>(
    rows:       impl Iterator<Item = &'a [u32]>,
    batch_size: usize,
    seq_len:    usize,
    device:     &B::Device,
) -> Tensor<B, 2, Int> {
    let flat: Vec<i32> = rows.flat_map(|r| r.iter().map(|&x| x as i32)).collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([batch_size, seq_len])
}

// ─── IssueBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct IssueBatch<B: Backend> {
    pub inputs: EncodedBatch<B>,
    /// [batch_size] class indices
    pub labels: Tensor<B, 1, Int>,
}

// ─── IssueBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct IssueBatcher<B: Backend> {
    device:  B::Device,
    pad_id:  u32,
    side:    PaddingSide,
    min_len: usize,
}

impl<B: Backend> IssueBatcher<B> {
    pub fn new(device: B::Device, tokenizer: &IssueTokenizer) -> Self {
        Self {
            device,
            pad_id:  tokenizer.pad_id(),
            side:    tokenizer.padding_side(),
            min_len: tokenizer.min_len(),
        }
    }
}

impl<B: Backend> Batcher<IssueItem, IssueBatch<B>> for IssueBatcher<B> {
    fn batch(&self, items: Vec<IssueItem>) -> IssueBatch<B> {
        let longest = items.iter().map(|i| i.encoding.len()).max().unwrap_or(0);
        let target = longest.max(self.min_len);

        let labels: Vec<i32> = items.iter().map(|i| i.label as i32).collect();
        let encodings: Vec<EncodedText> = items
            .into_iter()
            .map(|i| i.encoding.padded(target, self.pad_id, self.side))
            .collect();

        IssueBatch {
            inputs: EncodedBatch::stack(&encodings, &self.device),
            labels: Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device),
        }
    }
}
