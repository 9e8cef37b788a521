// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Runs ONE trial end to end:
//
//   Step 1: Resolve the model name       (Layer 3 - domain)
//   Step 2: Load and split the issues    (Layer 4 - data)
//   Step 3: Open the metrics sink        (Layer 6 - infra)
//   Step 4: Select the tokenizer         (Layer 6 - infra)
//   Step 5: Encode the three partitions  (Layer 4 - data)
//   Step 6: Build the model blueprint    (Layer 5 - ml)
//   Step 7: Train, validate, checkpoint  (Layer 5 - ml)
//   Step 8: Predict and write reports    (Layer 5 + 6)
//
// Step 1 touches no file, so an unknown model name fails before
// any directory is created. The checkpoint file is removed once
// the trial is over, whether it succeeded or not.
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    dataset::IssueDataset,
    resolver::{resolve_splits, ResolvedSplits, SPLIT_SEED},
    tokenizer::IssueTokenizer,
};
use crate::domain::model_spec::ModelSpec;
use crate::domain::report::{ClassificationReport, SummaryMetrics};
use crate::infra::{
    checkpoint::CheckpointManager,
    embeddings::{self, EmbeddingKind},
    metrics::MetricsLogger,
    output::{report_name, ReportWriter},
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    factory::{build_model, init_pretrained, ModelBlueprint, ModelRequest},
    inferencer::{predict_and_report, BurnClassifier, MICRO_BATCH_SIZE},
    model::IssueModel,
    trainer::{Trainer, TrainerSettings, TrialData, LOADER_WORKERS},
};

// ─── Run Configuration ───────────────────────────────────────────────────────
// Everything a trial needs, resolved from the command line.
// Written to config.json beside the metrics of every trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// -1 for CPU, otherwise the GPU index
    pub device:          i32,
    pub model:           String,
    pub embed:           String,
    pub sequence:        bool,
    pub disablefinetune: bool,
    pub train_time:      usize,
    pub local_model:     bool,
    pub do_predict:      bool,
    pub train_file:      PathBuf,
    pub valid_file:      PathBuf,
    pub test_file:       PathBuf,
    pub batch_size:      usize,
    pub base_lr:         f64,
    pub trial:           String,
    pub max_epochs:      usize,
    pub patience:        Option<usize>,
    pub output_dir:      PathBuf,
    pub ckpt_dir:        PathBuf,
    pub log_dir:         PathBuf,
    pub embed_dir:       PathBuf,
    pub seed:            u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            device:          0,
            model:           "textcnn".to_string(),
            embed:           "glove".to_string(),
            sequence:        false,
            disablefinetune: false,
            train_time:      1,
            local_model:     false,
            do_predict:      false,
            train_file:      PathBuf::new(),
            valid_file:      PathBuf::new(),
            test_file:       PathBuf::new(),
            batch_size:      8,
            base_lr:         5e-5,
            trial:           "trial".to_string(),
            max_epochs:      30,
            patience:        None,
            output_dir:      PathBuf::from("output"),
            ckpt_dir:        PathBuf::from("ckpts"),
            log_dir:         PathBuf::from("logs"),
            embed_dir:       PathBuf::from("embed"),
            seed:            SPLIT_SEED,
        }
    }
}

impl RunConfig {
    /// Experiment label shared by the log directory and the checkpoint.
    pub fn experiment(&self) -> String {
        format!("ep_{}_maxf1", self.max_epochs)
    }
}

// ─── Trial Summary ───────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TrialSummary {
    /// Test metrics of the best checkpoint
    pub best:       SummaryMetrics,
    /// Test metrics of the last epoch
    pub last:       SummaryMetrics,
    pub best_epoch: usize,
    pub epochs_run: usize,
    /// Per-class test report, when predictions were requested
    pub report:     Option<ClassificationReport>,
}

/// Per-trial resources shared by every architecture arm.
struct TrialContext<'a> {
    spec:       &'a ModelSpec,
    splits:     &'a ResolvedSplits,
    tokenizer:  &'a IssueTokenizer,
    sink:       &'a MetricsLogger,
    checkpoint: &'a CheckpointManager,
    settings:   TrainerSettings,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase<B: AutodiffBackend> {
    config: RunConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> TrainUseCase<B> {
    pub fn new(config: RunConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    /// Execute one trial and return its test metrics
    pub fn execute(&self) -> Result<TrialSummary> {
        let cfg = &self.config;

        // ── Step 1: Resolve the model before any IO ──────────────────────────
        let spec = ModelSpec::resolve(&cfg.model, cfg.local_model)?;

        // ── Step 2: Load and split ────────────────────────────────────────────
        println!("train_file:{}, test_file:{}", cfg.train_file.display(), cfg.test_file.display());
        let splits = resolve_splits(&cfg.train_file, &cfg.valid_file, &cfg.test_file, cfg.seed)?;

        // ── Step 3: Metrics sink ──────────────────────────────────────────────
        let sink = MetricsLogger::new(&cfg.log_dir, &cfg.trial, cfg.max_epochs)?;
        sink.write_config(cfg)?;

        // ── Step 4: Tokenizer ─────────────────────────────────────────────────
        let tokenizer = TokenizerStore::new(sink.dir()).select(&spec, &splits.train_corpus)?;
        tracing::info!("Tokenizer: {} ids, pads with '{}'", tokenizer.vocab_size(), tokenizer.pad_token());
        tracing::info!("Tokenizer: {:?}", tokenizer);

        // ── Step 5: Encode the partitions ─────────────────────────────────────
        let data = TrialData {
            train: IssueDataset::encode(&splits.train, &splits.labels, &tokenizer)?,
            valid: IssueDataset::encode(&splits.valid, &splits.labels, &tokenizer)?,
            test:  IssueDataset::encode(&splits.test, &splits.labels, &tokenizer)?,
        };

        // ── Step 6: Model blueprint ───────────────────────────────────────────
        let blueprint = build_model(&ModelRequest {
            spec:            &spec,
            num_classes:     splits.labels.len(),
            vocab_size:      tokenizer.vocab_size(),
            sequence:        cfg.sequence,
            freeze_backbone: cfg.disablefinetune,
        })?;
        tracing::info!("Model: {}", blueprint.describe());

        let opt = blueprint.optimization(cfg.base_lr, cfg.batch_size);
        let settings = TrainerSettings {
            max_epochs:    cfg.max_epochs,
            batch_size:    opt.batch_size,
            learning_rate: opt.learning_rate,
            schedule:      opt.schedule,
            patience:      cfg.patience,
            num_workers:   LOADER_WORKERS,
            seed:          cfg.seed,
        };

        // ── Steps 7-8: Train and report, then drop the checkpoint ────────────
        let checkpoint = CheckpointManager::new(&cfg.ckpt_dir, &spec.name, &cfg.trial, &cfg.experiment())?;
        let ctx = TrialContext {
            spec:       &spec,
            splits:     &splits,
            tokenizer:  &tokenizer,
            sink:       &sink,
            checkpoint: &checkpoint,
            settings,
        };
        let result = self.run_blueprint(&blueprint, &ctx, data);
        checkpoint.remove();
        result
    }

    /// Initialise the concrete module behind `blueprint` and train it.
    fn run_blueprint(&self, blueprint: &ModelBlueprint, ctx: &TrialContext<'_>, data: TrialData) -> Result<TrialSummary> {
        let cfg = &self.config;
        let device = &self.device;

        let pretrained = if blueprint.is_word_level() {
            embeddings::load_for(
                &EmbeddingKind::parse(&cfg.embed),
                &cfg.embed_dir,
                &ctx.tokenizer.vocabulary(),
                ctx.tokenizer.vocab_size(),
                cfg.seed,
            )?
        } else {
            None
        };

        match blueprint {
            ModelBlueprint::TextCnn(c) => self.fit_and_report(c.init::<B>(device, pretrained.as_ref()), ctx, data),
            ModelBlueprint::BiLstm(c) => self.fit_and_report(c.init::<B>(device, pretrained.as_ref()), ctx, data),
            ModelBlueprint::Rcnn(c) => self.fit_and_report(c.init::<B>(device, pretrained.as_ref()), ctx, data),
            ModelBlueprint::Pretrained { config, weights } => {
                let model = init_pretrained::<B>(config, weights.as_deref(), device)?;
                self.fit_and_report(model, ctx, data)
            }
        }
    }

    fn fit_and_report<M>(&self, model: M, ctx: &TrialContext<'_>, data: TrialData) -> Result<TrialSummary>
    where
        M: AutodiffModule<B> + IssueModel<B>,
        M::InnerModule: IssueModel<B::InnerBackend>,
    {
        let cfg = &self.config;
        let labels = &ctx.splits.labels;

        let trainer = Trainer::<B>::new(ctx.settings.clone(), labels, ctx.sink, ctx.checkpoint, self.device.clone());
        let outcome = trainer.fit(model, ctx.tokenizer, data)?;
        tracing::info!(
            "Best validation macro-F1 {:.4} at epoch {}/{}",
            outcome.best_score,
            outcome.best_epoch,
            outcome.epochs_run
        );

        let best = outcome.best_test.summary();
        let last = outcome.last_test.summary();
        ctx.sink.log_summary(outcome.epochs_run, "test", "_1_epoch", &best)?;
        ctx.sink.log_summary(outcome.epochs_run, "test", "_2_epoch", &last)?;

        let report = if cfg.do_predict {
            println!("start predict");
            let classifier = BurnClassifier::<B::InnerBackend, _>::new(outcome.best, self.device.clone());
            let (report, records) =
                predict_and_report(&classifier, ctx.tokenizer, &ctx.splits.test, labels, MICRO_BATCH_SIZE)?;

            for row in report.rows() {
                println!(
                    "{:>20} {:>9.4} {:>9.4} {:>9.4} {:>9}",
                    row.label, row.precision, row.recall, row.f1_score, row.support
                );
            }
            ctx.sink.log_report(outcome.epochs_run, "predict", &report)?;

            let writer = ReportWriter::new(
                &cfg.output_dir,
                &report_name(&cfg.train_file, &cfg.test_file),
                &ctx.spec.name,
                &cfg.trial,
            );
            writer.append_report(&report)?;
            writer.write_predictions(&records)?;
            Some(report)
        } else {
            None
        };

        Ok(TrialSummary {
            best,
            last,
            best_epoch: outcome.best_epoch,
            epochs_run: outcome.epochs_run,
            report,
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::resolver::tests::write_fixture;
    use crate::domain::model_spec::ConfigError;
    use burn::backend::{Autodiff, NdArray};
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray>;

    fn config(dir: &TempDir, data: PathBuf) -> RunConfig {
        RunConfig {
            embed:      "none".to_string(),
            do_predict: true,
            train_file: data.clone(),
            valid_file: data.clone(),
            test_file:  data,
            max_epochs: 1,
            output_dir: dir.path().join("output"),
            ckpt_dir:   dir.path().join("ckpts"),
            log_dir:    dir.path().join("logs"),
            embed_dir:  dir.path().join("embed"),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_textcnn_trial_end_to_end() {
        let dir = TempDir::new().unwrap();
        let data = write_fixture(dir.path(), "issues.json", 20);
        let cfg = config(&dir, data);

        let summary = TrainUseCase::<TestBackend>::new(cfg.clone(), Default::default())
            .execute()
            .unwrap();

        assert_eq!(summary.epochs_run, 1);
        let report = summary.report.unwrap();
        let labels: Vec<&str> = report.per_class.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, ["Error", "deployment", "other"]);
        // six test issues out of 20 (70/30 split)
        assert_eq!(report.per_class.iter().map(|(_, s)| s.support).sum::<usize>(), 6);
        assert_eq!(report.rows().len(), 6);

        let subclass = cfg.output_dir.join("subclass").join("issues_textcnn_trial.csv");
        let eval = cfg.output_dir.join("eval").join("issues_textcnn_trial.csv");
        assert!(subclass.exists());
        let mut reader = csv::Reader::from_path(&eval).unwrap();
        assert_eq!(reader.records().count(), 6);

        let log_dir = cfg.log_dir.join("trial").join("ep_1_maxf1");
        assert!(log_dir.join("config.json").exists());
        assert!(log_dir.join("metrics.csv").exists());

        let leftovers = std::fs::read_dir(&cfg.ckpt_dir).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_vocabulary_covers_the_whole_train_file() {
        let dir = TempDir::new().unwrap();
        let data = write_fixture(dir.path(), "issues.json", 20);
        let cfg = RunConfig { do_predict: false, ..config(&dir, data.clone()) };
        TrainUseCase::<TestBackend>::new(cfg.clone(), Default::default())
            .execute()
            .unwrap();

        let path = cfg.log_dir.join("trial").join("ep_1_maxf1").join("tokenizer.json");
        let tok = tokenizers::Tokenizer::from_file(&path).unwrap();
        let splits = resolve_splits(&data, &data, &data, cfg.seed).unwrap();
        // issue numbers appear only in their own issue, so test rows
        // are in the vocabulary only when the full file was counted
        for issue in &splits.test {
            assert!(tok.token_to_id(&issue.number.to_string()).is_some(), "#{} missing", issue.number);
        }
    }

    #[test]
    fn test_failed_trial_still_drops_checkpoint() {
        let dir = TempDir::new().unwrap();
        let data = write_fixture(dir.path(), "issues.json", 20);
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "").unwrap();
        // report files cannot be created under a regular file
        let cfg = RunConfig { output_dir: blocked, ..config(&dir, data) };

        assert!(TrainUseCase::<TestBackend>::new(cfg.clone(), Default::default()).execute().is_err());
        let leftovers = std::fs::read_dir(&cfg.ckpt_dir).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_without_predict_writes_no_reports() {
        let dir = TempDir::new().unwrap();
        let data = write_fixture(dir.path(), "issues.json", 20);
        let cfg = RunConfig { do_predict: false, ..config(&dir, data) };

        let summary = TrainUseCase::<TestBackend>::new(cfg.clone(), Default::default())
            .execute()
            .unwrap();
        assert!(summary.report.is_none());
        assert!((0.0..=1.0).contains(&summary.best.accuracy));
        assert!(!cfg.output_dir.exists());
    }

    #[test]
    fn test_unknown_model_fails_before_any_io() {
        let dir = TempDir::new().unwrap();
        let cfg = RunConfig {
            model: "no-such-model".to_string(),
            ..config(&dir, dir.path().join("missing.json"))
        };

        let err = TrainUseCase::<TestBackend>::new(cfg.clone(), Default::default())
            .execute()
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::UnknownModel { .. })));
        assert!(!cfg.log_dir.exists());
        assert!(!cfg.ckpt_dir.exists());
    }
}
