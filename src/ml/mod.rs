// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn modules and loops live here:
//
//   model.rs       — IssueModel: EncodedBatch → class logits
//   word_models.rs — TextCNN, BiLSTM, RCNN over word vocabularies
//   backbone.rs    — transformer backbone + classification head
//   factory.rs     — model name → blueprint → initialised module
//   schedule.rs    — constant / warm-up + linear-decay rates
//   trainer.rs     — epoch loop with explicit post-epoch stages
//   inferencer.rs  — micro-batched prediction and reporting
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// Model contract shared by every architecture
pub mod model;

/// Word-vocabulary architectures
pub mod word_models;

/// Pretrained-backbone classifier
pub mod backbone;

/// Model factory
pub mod factory;

/// Learning-rate schedules
pub mod schedule;

/// Training loop with validation, checkpointing and early stopping
pub mod trainer;

/// Batched inference and classification reports
pub mod inferencer;
