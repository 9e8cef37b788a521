// ============================================================
// Layer 2 — SweepUseCase
// ============================================================
// Repeats the same trial `train_time` times and records each
// run in the ledger:
//
//   <output_dir>/rq1/<model>_<embed>_<trial>_out.csv
//
// The ledger is owned here, not by the trials: every trial hands
// back its metrics and the sweep appends one row and rewrites
// the file straight away, so rows of completed trials survive a
// crash later in the sweep.

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;

use crate::application::train_use_case::{RunConfig, TrainUseCase};
use crate::domain::model_spec::ModelSpec;
use crate::infra::{
    ledger::{ledger_path, run_name, Ledger, LedgerRow},
    output::file_stem,
};

pub struct SweepUseCase<B: AutodiffBackend> {
    config: RunConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> SweepUseCase<B> {
    pub fn new(config: RunConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    /// Run every trial and return the updated ledger.
    pub fn execute(&self) -> Result<Ledger> {
        let cfg = &self.config;
        let spec = ModelSpec::resolve(&cfg.model, cfg.local_model)?;

        let mut ledger = Ledger::open(ledger_path(&cfg.output_dir, &spec.name, &cfg.embed, &cfg.trial))?;
        let stem = file_stem(&cfg.train_file);

        for t in 0..cfg.train_time {
            tracing::info!("Trial {}/{} of '{}'", t + 1, cfg.train_time, cfg.trial);

            let summary = TrainUseCase::<B>::new(cfg.clone(), self.device.clone()).execute()?;
            tracing::info!(
                "Trial {} kept epoch {} of {}",
                t + 1,
                summary.best_epoch,
                summary.epochs_run
            );
            ledger.push(LedgerRow::new(run_name(&stem, t), &summary.best, &summary.last));
            ledger.save()?;
        }

        tracing::info!("Ledger '{}' holds {} rows", ledger.path().display(), ledger.rows().len());
        Ok(ledger)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::resolver::tests::write_fixture;
    use burn::backend::{Autodiff, NdArray};
    use tempfile::TempDir;

    type TestBackend = Autodiff<NdArray>;

    fn config(dir: &TempDir, train_time: usize) -> RunConfig {
        let data = write_fixture(dir.path(), "repo.json", 20);
        RunConfig {
            embed:      "none".to_string(),
            train_time,
            train_file: data.clone(),
            valid_file: data.clone(),
            test_file:  data,
            max_epochs: 1,
            output_dir: dir.path().join("output"),
            ckpt_dir:   dir.path().join("ckpts"),
            log_dir:    dir.path().join("logs"),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_rows_accumulate_across_sweeps() {
        let dir = TempDir::new().unwrap();

        let ledger = SweepUseCase::<TestBackend>::new(config(&dir, 2), Default::default())
            .execute()
            .unwrap();
        let names: Vec<&str> = ledger.rows().iter().map(|r| r.repo.as_str()).collect();
        assert_eq!(names, ["repo_times_0", "repo_times_1"]);
        assert_eq!(
            ledger.path(),
            dir.path().join("output").join("rq1").join("textcnn_none_trial_out.csv")
        );

        // a second sweep keeps the earlier rows
        let ledger = SweepUseCase::<TestBackend>::new(config(&dir, 1), Default::default())
            .execute()
            .unwrap();
        let reopened = Ledger::open(ledger.path()).unwrap();
        assert_eq!(reopened.rows().len(), 3);
        assert_eq!(reopened.rows()[2].repo, "repo_times_0");
        assert!(reopened.rows()[0].best_accuracy.is_some());
    }

    #[test]
    fn test_unknown_model_touches_no_ledger() {
        let dir = TempDir::new().unwrap();
        let cfg = RunConfig { model: "nope".to_string(), ..config(&dir, 1) };
        assert!(SweepUseCase::<TestBackend>::new(cfg, Default::default()).execute().is_err());
        assert!(!dir.path().join("output").exists());
    }
}
