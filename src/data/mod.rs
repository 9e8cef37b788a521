// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw JSON issue files to tensor batches:
//
//   JSON files
//       │
//       ▼
//   JsonIssueFile     → deserialises one file of issues
//       │
//       ▼
//   resolve_splits    → single-file / shared / explicit splits
//       │               (stratified, seed 42) + label index
//       ▼
//   IssueTokenizer    → word-level / encoder / decoder encoding
//       │
//       ▼
//   IssueDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   IssueBatcher      → pads and stacks samples into tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop

/// Reads JSON arrays of issues
pub mod loader;

/// Seeded stratified train/test split
pub mod splitter;

/// Decides how train/valid/test are obtained
pub mod resolver;

/// Builds the text a model sees for one issue
pub mod composer;

/// Tokenizer strategies behind one encode/pad interface
pub mod tokenizer;

/// Implements Burn's Dataset trait for encoded issues
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
