// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches disk or the network on behalf of the
// other layers:
//
//   tokenizer_store.rs — picks the tokenizer for a model and
//                        builds the word vocabulary
//   embeddings.rs      — GloVe / word2vec / fastText matrices
//   checkpoint.rs      — best-model checkpoint (CompactRecorder)
//   metrics.rs         — per-trial metrics CSV + config.json
//   output.rs          — classification report and prediction CSVs
//   ledger.rs          — per-sweep results table

/// Tokenizer selection and word-vocabulary building
pub mod tokenizer_store;

/// Pretrained word-embedding matrices
pub mod embeddings;

/// Best-checkpoint save / restore / removal
pub mod checkpoint;

/// Metrics sink
pub mod metrics;

/// Report and prediction CSV writers
pub mod output;

/// Experiment ledger
pub mod ledger;
