// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Seams between the layers:
//   - IssueSource     → implemented by the JSON loader (Layer 4)
//   - IssueClassifier → implemented by the burn inferencer (Layer 5)
//
// The batched inference/reporting routine only sees
// IssueClassifier, so it can be exercised without a model.

use anyhow::Result;

use crate::domain::{encoded::EncodedText, issue::Issue};

// ─── IssueSource ──────────────────────────────────────────────────────────────
/// Anything that can produce a list of labelled issues.
pub trait IssueSource {
    fn load_all(&self) -> Result<Vec<Issue>>;
}

// ─── IssueClassifier ──────────────────────────────────────────────────────────
/// One forward pass over a micro-batch of equally padded encodings.
///
/// Returns the arg-max class index of every encoding, in order.
pub trait IssueClassifier {
    fn predict(&self, batch: &[EncodedText]) -> Result<Vec<usize>>;
}
