// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal: train and score
// a classifier, possibly several times over.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - File access only through Layer 4 and Layer 6 types
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// One trial: split, tokenize, build, fit, test, report
pub mod train_use_case;

// Repeated trials recorded in the experiment ledger
pub mod sweep_use_case;
