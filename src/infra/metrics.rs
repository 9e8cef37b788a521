// ============================================================
// Layer 6 — Metrics Sink
// ============================================================
// Per-trial event log, written under
//   <log_dir>/<trial>/ep_<max_epochs>_maxf1/
//
//   metrics.csv  — one `step,name,value` row per logged value,
//                  appended across runs of the same trial
//   config.json  — the resolved run configuration
//
// Aggregate metric names follow the ledger's column names:
//   <stage>_acc, _precision, _recall, _f1_marco,
//   _f1_marco_weight, _f1_mirco  (+ optional epoch suffix)
//
// Example CSV output:
//   step,name,value
//   1,train_loss,1.093201
//   1,valid_f1_marco_1_epoch,0.412000

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use crate::domain::report::{ClassificationReport, SummaryMetrics};

/// One row of the metrics CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    pub step:  usize,
    pub name:  String,
    pub value: f64,
}

/// `(name, value)` pairs for the six aggregate metrics.
pub fn summary_entries(stage: &str, suffix: &str, m: &SummaryMetrics) -> Vec<(String, f64)> {
    vec![
        (format!("{stage}_acc{suffix}"), m.accuracy),
        (format!("{stage}_precision{suffix}"), m.precision),
        (format!("{stage}_recall{suffix}"), m.recall),
        (format!("{stage}_f1_marco{suffix}"), m.f1_macro),
        (format!("{stage}_f1_marco_weight{suffix}"), m.f1_weighted),
        (format!("{stage}_f1_mirco{suffix}"), m.f1_micro),
    ]
}

pub struct MetricsLogger {
    dir:      PathBuf,
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open the sink for one trial, creating the directory and the
    /// CSV header if the file is new.
    pub fn new(log_dir: impl AsRef<Path>, trial: &str, max_epochs: usize) -> Result<Self> {
        let dir = log_dir.as_ref().join(trial).join(format!("ep_{max_epochs}_maxf1"));
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut w = csv::Writer::from_path(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            w.write_record(["step", "name", "value"])?;
            w.flush()?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { dir, csv_path })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a batch of values for one step.
    pub fn log_all<I, S>(&self, step: usize, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        for (name, value) in values {
            w.serialize(MetricEvent { step, name: name.into(), value })?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn log_scalar(&self, step: usize, name: &str, value: f64) -> Result<()> {
        self.log_all(step, [(name, value)])
    }

    pub fn log_summary(&self, step: usize, stage: &str, suffix: &str, m: &SummaryMetrics) -> Result<()> {
        self.log_all(step, summary_entries(stage, suffix, m))
    }

    /// Per-class precision / recall / F1 / support for one stage.
    pub fn log_report(&self, step: usize, stage: &str, report: &ClassificationReport) -> Result<()> {
        let values = report.per_class.iter().flat_map(|(label, s)| {
            [
                (format!("{stage}_{label}_precision"), s.precision),
                (format!("{stage}_{label}_recall"), s.recall),
                (format!("{stage}_{label}_f1"), s.f1),
                (format!("{stage}_{label}_support"), s.support as f64),
            ]
        });
        self.log_all(step, values)
    }

    /// Write `config.json` next to the metrics.
    pub fn write_config<T: Serialize>(&self, config: &T) -> Result<()> {
        let path = self.dir.join("config.json");
        fs::write(&path, serde_json::to_string_pretty(config)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }
}

#[cfg(test)]
impl MetricsLogger {
    /// Every event logged so far.
    pub(crate) fn read_events(&self) -> Result<Vec<MetricEvent>> {
        let mut r = csv::Reader::from_path(&self.csv_path)
            .with_context(|| format!("Cannot read '{}'", self.csv_path.display()))?;
        let events = r.deserialize().collect::<Result<Vec<MetricEvent>, _>>()?;
        Ok(events)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::label_set::LabelIndex;
    use tempfile::TempDir;

    #[test]
    fn test_directory_layout() {
        let dir = TempDir::new().unwrap();
        let sink = MetricsLogger::new(dir.path(), "trial_a", 30).unwrap();
        assert_eq!(sink.dir(), dir.path().join("trial_a/ep_30_maxf1"));
        assert!(sink.dir().join("metrics.csv").exists());
    }

    #[test]
    fn test_events_append_across_loggers() {
        let dir = TempDir::new().unwrap();
        MetricsLogger::new(dir.path(), "t", 1).unwrap().log_scalar(1, "train_loss", 0.5).unwrap();
        let sink = MetricsLogger::new(dir.path(), "t", 1).unwrap();
        sink.log_scalar(2, "lr", 0.001).unwrap();

        let events = sink.read_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], MetricEvent { step: 1, name: "train_loss".into(), value: 0.5 });
        assert_eq!(events[1].name, "lr");
    }

    #[test]
    fn test_summary_names_match_ledger_columns() {
        let names: Vec<String> = summary_entries("valid", "_1_epoch", &SummaryMetrics::default())
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert!(names.contains(&"valid_f1_marco_1_epoch".to_string()));
        assert!(names.contains(&"valid_f1_mirco_1_epoch".to_string()));
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn test_log_report_and_config() {
        let dir = TempDir::new().unwrap();
        let sink = MetricsLogger::new(dir.path(), "t", 1).unwrap();
        let labels = LabelIndex::from_labels(["a", "b"]);
        let report = ClassificationReport::compute(&[0, 1], &[0, 0], &labels);
        sink.log_report(3, "test", &report).unwrap();
        sink.write_config(&serde_json::json!({ "model": "textcnn" })).unwrap();

        let events = sink.read_events().unwrap();
        assert_eq!(events.len(), 8);
        assert!(events.iter().all(|e| e.step == 3));
        assert!(events.iter().any(|e| e.name == "test_b_recall" && e.value == 0.0));
        assert!(sink.dir().join("config.json").exists());
    }
}
