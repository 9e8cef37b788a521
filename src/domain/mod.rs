// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs and traits that define the core concepts
// of the issue classifier:
//
//   issue.rs      — one labelled GitHub issue as loaded from JSON
//   label_set.rs  — the sorted label set and its index bijection
//   model_spec.rs — the registry of recognised model names
//   encoded.rs    — a tokenised, padded issue text
//   report.rs     — classification report and prediction rows
//   traits.rs     — seams implemented by the data and ml layers
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits

pub mod issue;

pub mod label_set;

pub mod model_spec;

pub mod encoded;

pub mod report;

pub mod traits;
