// ============================================================
// Layer 6 — Experiment Ledger
// ============================================================
// One CSV per sweep, `<output_dir>/rq1/<model>_<embed>_<trial>_out.csv`,
// one row per trial. The table is loaded if it exists, rows are
// pushed by the caller, and `save` rewrites the whole file, so a
// crash mid-sweep keeps every completed trial.
//
// Column names are part of the file format and are kept verbatim
// (`f1_marco`, `f1_mirco`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::model_spec::sanitize;
use crate::domain::report::SummaryMetrics;

const COLUMNS: [&str; 13] = [
    "repo",
    "test_acc_1_epoch",
    "test_precision_1_epoch",
    "test_recall_1_epoch",
    "test_f1_marco_1_epoch",
    "test_f1_marco_weight_1_epoch",
    "test_f1_mirco_1_epoch",
    "test_acc_2_epoch",
    "test_precision_2_epoch",
    "test_recall_2_epoch",
    "test_f1_marco_2_epoch",
    "test_f1_marco_weight_2_epoch",
    "test_f1_mirco_2_epoch",
];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerRow {
    pub repo: String,

    // best checkpoint
    #[serde(rename = "test_acc_1_epoch")]
    pub best_accuracy:    Option<f64>,
    #[serde(rename = "test_precision_1_epoch")]
    pub best_precision:   Option<f64>,
    #[serde(rename = "test_recall_1_epoch")]
    pub best_recall:      Option<f64>,
    #[serde(rename = "test_f1_marco_1_epoch")]
    pub best_f1_macro:    Option<f64>,
    #[serde(rename = "test_f1_marco_weight_1_epoch")]
    pub best_f1_weighted: Option<f64>,
    #[serde(rename = "test_f1_mirco_1_epoch")]
    pub best_f1_micro:    Option<f64>,

    // last epoch
    #[serde(rename = "test_acc_2_epoch")]
    pub last_accuracy:    Option<f64>,
    #[serde(rename = "test_precision_2_epoch")]
    pub last_precision:   Option<f64>,
    #[serde(rename = "test_recall_2_epoch")]
    pub last_recall:      Option<f64>,
    #[serde(rename = "test_f1_marco_2_epoch")]
    pub last_f1_macro:    Option<f64>,
    #[serde(rename = "test_f1_marco_weight_2_epoch")]
    pub last_f1_weighted: Option<f64>,
    #[serde(rename = "test_f1_mirco_2_epoch")]
    pub last_f1_micro:    Option<f64>,
}

impl LedgerRow {
    pub fn new(repo: impl Into<String>, best: &SummaryMetrics, last: &SummaryMetrics) -> Self {
        Self {
            repo:             repo.into(),
            best_accuracy:    Some(best.accuracy),
            best_precision:   Some(best.precision),
            best_recall:      Some(best.recall),
            best_f1_macro:    Some(best.f1_macro),
            best_f1_weighted: Some(best.f1_weighted),
            best_f1_micro:    Some(best.f1_micro),
            last_accuracy:    Some(last.accuracy),
            last_precision:   Some(last.precision),
            last_recall:      Some(last.recall),
            last_f1_macro:    Some(last.f1_macro),
            last_f1_weighted: Some(last.f1_weighted),
            last_f1_micro:    Some(last.f1_micro),
        }
    }
}

/// `<train stem>_times_<t>`
pub fn run_name(train_stem: &str, time: usize) -> String {
    format!("{train_stem}_times_{time}")
}

pub fn ledger_path(output_dir: &Path, model: &str, embed: &str, trial: &str) -> PathBuf {
    output_dir
        .join("rq1")
        .join(format!("{}_{}_{}_out.csv", sanitize(model), embed, trial))
}

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    rows: Vec<LedgerRow>,
}

impl Ledger {
    /// Load the ledger at `path`, or start an empty one.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!("Starting new ledger '{}'", path.display());
            return Ok(Self { path, rows: Vec::new() });
        }

        let mut r = csv::Reader::from_path(&path)
            .with_context(|| format!("Cannot read ledger '{}'", path.display()))?;
        let rows = r
            .deserialize()
            .collect::<Result<Vec<LedgerRow>, _>>()
            .with_context(|| format!("Malformed ledger '{}'", path.display()))?;

        tracing::info!("Loaded {} ledger rows from '{}'", rows.len(), path.display());
        Ok(Self { path, rows })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn push(&mut self, row: LedgerRow) {
        self.rows.push(row);
    }

    /// Rewrite the whole table.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }

        let mut w = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Cannot write ledger '{}'", self.path.display()))?;
        if self.rows.is_empty() {
            w.write_record(COLUMNS)?;
        }
        for row in &self.rows {
            w.serialize(row)?;
        }
        w.flush()?;

        tracing::debug!("Ledger saved ({} rows)", self.rows.len());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn metrics(f1: f64) -> SummaryMetrics {
        SummaryMetrics { f1_macro: f1, ..Default::default() }
    }

    #[test]
    fn test_paths() {
        assert_eq!(run_name("vscode", 2), "vscode_times_2");
        assert_eq!(
            ledger_path(Path::new("output"), "bert-base-uncased", "none", "t1"),
            Path::new("output/rq1/bert_base_uncased_none_t1_out.csv")
        );
    }

    #[test]
    fn test_rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rq1/ledger.csv");

        let mut ledger = Ledger::open(&path).unwrap();
        assert!(ledger.rows().is_empty());
        ledger.push(LedgerRow::new("a_times_0", &metrics(0.7), &metrics(0.6)));
        ledger.save().unwrap();

        let mut ledger = Ledger::open(&path).unwrap();
        ledger.push(LedgerRow::new("a_times_1", &metrics(0.8), &metrics(0.5)));
        ledger.save().unwrap();

        let ledger = Ledger::open(&path).unwrap();
        assert_eq!(ledger.rows().len(), 2);
        assert_eq!(ledger.rows()[0].repo, "a_times_0");
        assert_eq!(ledger.rows()[1].best_f1_macro, Some(0.8));
        assert_eq!(ledger.rows()[1].last_f1_macro, Some(0.5));
    }

    #[test]
    fn test_header_and_blank_cells() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.csv");
        let header = "repo,test_acc_1_epoch,test_precision_1_epoch,test_recall_1_epoch,\
test_f1_marco_1_epoch,test_f1_marco_weight_1_epoch,test_f1_mirco_1_epoch,\
test_acc_2_epoch,test_precision_2_epoch,test_recall_2_epoch,\
test_f1_marco_2_epoch,test_f1_marco_weight_2_epoch,test_f1_mirco_2_epoch";
        fs::write(&path, format!("{header}\nold_times_0,0.5,,,,,,,,,,,\n")).unwrap();

        let mut ledger = Ledger::open(&path).unwrap();
        assert_eq!(ledger.rows()[0].best_accuracy, Some(0.5));
        assert_eq!(ledger.rows()[0].best_precision, None);

        ledger.push(LedgerRow::new("new_times_0", &metrics(1.0), &metrics(1.0)));
        ledger.save().unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next().unwrap(), header);
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_empty_ledger_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("empty.csv")).unwrap();
        ledger.save().unwrap();
        let text = fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(text.trim_end(), COLUMNS.join(","));
    }
}
