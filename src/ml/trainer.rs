// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Explicit epoch loop over any IssueModel:
//
//   for each epoch:
//     shuffled training pass (AdamW, cross-entropy)
//     EPOCH_STAGES, in order:
//       Validate        → valid loss + aggregate metrics
//       LogPredictions  → per-class report of valid and test
//       SelectBest      → checkpoint when valid macro-F1 improves
//       LogLearningRate → rate of the epoch's last step
//
//   after the loop:
//     last-epoch model → test  (ledger "_2_epoch" columns)
//     best checkpoint  → test  (ledger "_1_epoch" columns)
//
// Training runs on the autodiff backend; every evaluation runs
// on `model.valid()`, i.e. the inner backend without gradients
// and with dropout disabled.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::Result;
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::AutodiffModule,
    lr_scheduler::LrScheduler,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::{IssueBatch, IssueBatcher},
    dataset::IssueDataset,
    tokenizer::IssueTokenizer,
};
use crate::domain::label_set::LabelIndex;
use crate::domain::report::ClassificationReport;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::model::IssueModel;
use crate::ml::schedule::{IssueLrScheduler, ScheduleKind};

/// Data-loader worker threads for training and evaluation batches.
pub const LOADER_WORKERS: usize = 8;

/// Metric the best checkpoint is selected on (maximised).
pub const MONITORED_METRIC: &str = "valid_f1_marco_1_epoch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochStage {
    Validate,
    LogPredictions,
    SelectBest,
    LogLearningRate,
}

/// Order in which the stages run after every training pass.
pub const EPOCH_STAGES: [EpochStage; 4] = [
    EpochStage::Validate,
    EpochStage::LogPredictions,
    EpochStage::SelectBest,
    EpochStage::LogLearningRate,
];

#[derive(Debug, Clone)]
pub struct TrainerSettings {
    pub max_epochs:    usize,
    pub batch_size:    usize,
    pub learning_rate: f64,
    pub schedule:      ScheduleKind,
    /// Stop after this many epochs without improvement
    pub patience:      Option<usize>,
    pub num_workers:   usize,
    pub seed:          u64,
}

/// Encoded partitions of one trial.
pub struct TrialData {
    pub train: IssueDataset,
    pub valid: IssueDataset,
    pub test:  IssueDataset,
}

/// Loss and per-issue class indices of one evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub loss:      f64,
    pub truth:     Vec<usize>,
    pub predicted: Vec<usize>,
}

impl Evaluation {
    pub fn report(&self, labels: &LabelIndex) -> ClassificationReport {
        ClassificationReport::compute(&self.truth, &self.predicted, labels)
    }
}

pub struct FitOutcome<M> {
    /// Best-checkpoint model (falls back to the last epoch)
    pub best:       M,
    pub best_epoch: usize,
    pub best_score: f64,
    pub epochs_run: usize,
    /// Test report of the last-epoch model
    pub last_test:  ClassificationReport,
    /// Test report of the best-checkpoint model
    pub best_test:  ClassificationReport,
}

/// Mean batch loss and arg-max predictions over a loader.
pub fn evaluate<B: Backend, M: IssueModel<B>>(model: &M, loader: &dyn DataLoader<IssueBatch<B>>) -> Evaluation {
    let mut eval = Evaluation::default();
    let mut batches = 0usize;

    for batch in loader.iter() {
        let output = model.forward_classification(batch);
        eval.loss += output.loss.into_scalar().elem::<f64>();
        batches += 1;

        // argmax(1) returns [batch, 1]; flatten to [batch]
        let predicted = output.output.argmax(1).flatten::<1>(0, 1);
        eval.predicted.extend(predicted.into_data().iter::<i64>().map(|v| v as usize));
        eval.truth.extend(output.targets.into_data().iter::<i64>().map(|v| v as usize));
    }

    eval.loss = if batches > 0 { eval.loss / batches as f64 } else { f64::NAN };
    eval
}

pub struct Trainer<'a, B: AutodiffBackend> {
    settings:   TrainerSettings,
    labels:     &'a LabelIndex,
    sink:       &'a MetricsLogger,
    checkpoint: &'a CheckpointManager,
    device:     B::Device,
}

impl<'a, B: AutodiffBackend> Trainer<'a, B> {
    pub fn new(
        settings:   TrainerSettings,
        labels:     &'a LabelIndex,
        sink:       &'a MetricsLogger,
        checkpoint: &'a CheckpointManager,
        device:     B::Device,
    ) -> Self {
        Self { settings, labels, sink, checkpoint, device }
    }

    pub fn fit<M>(&self, mut model: M, tokenizer: &IssueTokenizer, data: TrialData) -> Result<FitOutcome<M::InnerModule>>
    where
        M: AutodiffModule<B> + IssueModel<B>,
        M::InnerModule: IssueModel<B::InnerBackend>,
    {
        let s = &self.settings;
        let train_len = data.train.len();

        // ── Loaders ───────────────────────────────────────────────────────────
        let train_loader = DataLoaderBuilder::new(IssueBatcher::<B>::new(self.device.clone(), tokenizer))
            .batch_size(s.batch_size)
            .shuffle(s.seed)
            .num_workers(s.num_workers)
            .build(data.train);
        let eval_loader = |dataset: IssueDataset| {
            DataLoaderBuilder::new(IssueBatcher::<B::InnerBackend>::new(self.device.clone(), tokenizer))
                .batch_size(s.batch_size)
                .num_workers(s.num_workers)
                .build(dataset)
        };
        let valid_loader = eval_loader(data.valid);
        let test_loader = eval_loader(data.test);

        // ── Optimiser and schedule ────────────────────────────────────────────
        let mut optim = AdamWConfig::new().with_weight_decay(0.01).init::<B, M>();
        let steps_per_epoch = train_len.div_ceil(s.batch_size.max(1));
        let mut scheduler = IssueLrScheduler::new(s.schedule, s.learning_rate, steps_per_epoch * s.max_epochs)?;
        let mut last_lr = s.learning_rate;

        tracing::info!(
            "Training {} issues for up to {} epochs ({} steps/epoch, lr={:e})",
            train_len, s.max_epochs, steps_per_epoch, s.learning_rate
        );

        let mut best_score = f64::NEG_INFINITY;
        let mut best_epoch = 0usize;
        let mut stale_epochs = 0usize;
        let mut epochs_run = 0usize;

        for epoch in 1..=s.max_epochs {
            // ── Training pass ─────────────────────────────────────────────────
            let mut loss_sum = 0.0f64;
            let mut batches = 0usize;
            for batch in train_loader.iter() {
                let lr = scheduler.step();
                last_lr = lr;
                let output = model.forward_classification(batch);
                loss_sum += output.loss.clone().into_scalar().elem::<f64>();
                batches += 1;

                let grads = output.loss.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(lr, model, grads);
            }
            let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
            self.sink.log_scalar(epoch, "train_loss", train_loss)?;
            epochs_run = epoch;

            // ── Epoch stages ──────────────────────────────────────────────────
            let model_valid = model.valid();
            let mut valid_eval = Evaluation::default();
            let mut valid_report = None;

            for stage in EPOCH_STAGES {
                match stage {
                    EpochStage::Validate => {
                        valid_eval = evaluate(&model_valid, valid_loader.as_ref());
                        let report = valid_eval.report(self.labels);
                        self.sink.log_scalar(epoch, "valid_loss", valid_eval.loss)?;
                        self.sink.log_summary(epoch, "valid", "_1_epoch", &report.summary())?;
                        valid_report = Some(report);
                    }
                    EpochStage::LogPredictions => {
                        if let Some(report) = &valid_report {
                            self.sink.log_report(epoch, "valid", report)?;
                        }
                        let test_report = evaluate(&model_valid, test_loader.as_ref()).report(self.labels);
                        self.sink.log_report(epoch, "test", &test_report)?;
                    }
                    EpochStage::SelectBest => {
                        let score = valid_report.as_ref().map_or(0.0, |r| r.summary().f1_macro);
                        if score > best_score {
                            self.checkpoint.save_best(&model, epoch, score)?;
                            best_score = score;
                            best_epoch = epoch;
                            stale_epochs = 0;
                        } else {
                            stale_epochs += 1;
                        }
                    }
                    EpochStage::LogLearningRate => {
                        self.sink.log_scalar(epoch, "lr", last_lr)?;
                    }
                }
            }

            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | valid_loss={:.4} | {}={:.4}",
                epoch,
                s.max_epochs,
                train_loss,
                valid_eval.loss,
                MONITORED_METRIC,
                valid_report.as_ref().map_or(0.0, |r| r.summary().f1_macro),
            );

            if s.patience.is_some_and(|p| stale_epochs >= p) {
                tracing::info!("No improvement for {} epochs, stopping at epoch {}", stale_epochs, epoch);
                break;
            }
        }

        // ── Final test passes ─────────────────────────────────────────────────
        let last = model.valid();
        let last_test = evaluate(&last, test_loader.as_ref()).report(self.labels);

        let best = if self.checkpoint.exists() {
            self.checkpoint.restore::<B::InnerBackend, _>(last.clone(), &self.device)?
        } else {
            tracing::warn!("No checkpoint was saved; using the last-epoch model as best");
            last
        };
        let best_test = evaluate(&best, test_loader.as_ref()).report(self.labels);

        tracing::info!(
            "Training complete after {} steps: best {}={:.4} at epoch {}",
            scheduler.steps(), MONITORED_METRIC, best_score, best_epoch
        );

        Ok(FitOutcome { best, best_epoch, best_score, epochs_run, last_test, best_test })
    }
}
