// ============================================================
// Layer 4 — Issue Dataset
// ============================================================
// Issues are tokenised once, up front, so tokenizer errors
// surface before training starts. Items carry unpadded
// encodings; padding happens per batch in IssueBatcher.

use anyhow::{anyhow, Result};
use burn::data::dataset::Dataset;

use crate::data::composer::training_text;
use crate::data::tokenizer::IssueTokenizer;
use crate::domain::encoded::EncodedText;
use crate::domain::issue::Issue;
use crate::domain::label_set::LabelIndex;

/// One tokenised issue and its class index.
#[derive(Debug, Clone)]
pub struct IssueItem {
    pub encoding: EncodedText,
    pub label:    usize,
}

pub struct IssueDataset {
    items: Vec<IssueItem>,
}

impl IssueDataset {
    /// Tokenise a partition against the global label index.
    pub fn encode(issues: &[Issue], labels: &LabelIndex, tokenizer: &IssueTokenizer) -> Result<Self> {
        let items = issues
            .iter()
            .map(|issue| {
                let label = labels
                    .index_of(&issue.label)
                    .ok_or_else(|| anyhow!("Issue #{} has unindexed label '{}'", issue.number, issue.label))?;
                let encoding = tokenizer.encode(&training_text(issue))?;
                Ok(IssueItem { encoding, label })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Encoded {} issues", items.len());
        Ok(Self { items })
    }
}

impl Dataset<IssueItem> for IssueDataset {
    fn get(&self, index: usize) -> Option<IssueItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
