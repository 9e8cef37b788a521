// ============================================================
// Layer 6 — Report Writers
// ============================================================
// Two CSV artifacts per prediction run:
//
//   <output_dir>/subclass/<name>_<model>_<trial>.csv
//       per-class report, APPENDED (header + rows per run)
//   <output_dir>/eval/<name>_<model>_<trial>.csv
//       one row per test issue, OVERWRITTEN
//
// <name> is the train file stem, or "<train>_<test>" when the
// test file differs; <model> has '-' and '/' replaced by '_'.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use crate::domain::model_spec::sanitize;
use crate::domain::report::{ClassificationReport, PredictionRecord};

/// File name up to its first dot (`issues.train.json` → `issues`).
pub fn file_stem(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().split('.').next().unwrap_or_default().to_string())
        .unwrap_or_default()
}

/// Base name shared by the report files of a run.
pub fn report_name(train: &Path, test: &Path) -> String {
    if train == test {
        file_stem(train)
    } else {
        format!("{}_{}", file_stem(train), file_stem(test))
    }
}

pub struct ReportWriter {
    output_dir: PathBuf,
    file_name:  String,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, name: &str, model: &str, trial: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_name:  format!("{}_{}_{}.csv", name, sanitize(model), trial),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("subclass").join(&self.file_name)
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.output_dir.join("eval").join(&self.file_name)
    }

    /// Append the per-class report, header included.
    pub fn append_report(&self, report: &ClassificationReport) -> Result<PathBuf> {
        let path = self.report_path();
        ensure_parent(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;
        let mut w = csv::Writer::from_writer(file);
        for row in report.rows() {
            w.serialize(row)?;
        }
        w.flush()?;

        tracing::info!("Classification report appended to '{}'", path.display());
        Ok(path)
    }

    /// Replace the per-issue prediction table.
    pub fn write_predictions(&self, records: &[PredictionRecord]) -> Result<PathBuf> {
        let path = self.predictions_path();
        ensure_parent(&path)?;

        let mut w = csv::Writer::from_path(&path)
            .with_context(|| format!("Cannot create '{}'", path.display()))?;
        if records.is_empty() {
            w.write_record(["number", "html_url", "title", "description", "true_label", "pred_label"])?;
        }
        for record in records {
            w.serialize(record)?;
        }
        w.flush()?;

        tracing::info!("{} predictions written to '{}'", records.len(), path.display());
        Ok(path)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::label_set::LabelIndex;
    use tempfile::TempDir;

    #[test]
    fn test_names() {
        let train = Path::new("data/vscode.train.json");
        assert_eq!(file_stem(train), "vscode");
        assert_eq!(report_name(train, train), "vscode");
        assert_eq!(report_name(train, Path::new("data/flutter.json")), "vscode_flutter");

        let w = ReportWriter::new("out", "vscode", "microsoft/codebert-base", "t1");
        assert_eq!(w.report_path(), Path::new("out/subclass/vscode_microsoft_codebert_base_t1.csv"));
        assert_eq!(w.predictions_path(), Path::new("out/eval/vscode_microsoft_codebert_base_t1.csv"));
    }

    #[test]
    fn test_report_is_appended() {
        let dir = TempDir::new().unwrap();
        let w = ReportWriter::new(dir.path(), "issues", "textcnn", "t");
        let labels = LabelIndex::from_labels(["bug", "feature"]);
        let report = ClassificationReport::compute(&[0, 1], &[0, 1], &labels);

        w.append_report(&report).unwrap();
        let path = w.append_report(&report).unwrap();

        let text = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2 * (1 + 5));
        assert_eq!(lines[0], ",precision,recall,f1-score,support");
        assert_eq!(lines[6], lines[0]);
        assert!(lines[3].starts_with("accuracy,1.0,1.0,1.0,1.0"));
        assert!(lines[5].starts_with("weighted avg,"));
    }

    #[test]
    fn test_predictions_are_overwritten() {
        let dir = TempDir::new().unwrap();
        let w = ReportWriter::new(dir.path(), "issues", "textcnn", "t");
        let record = PredictionRecord {
            number:      7,
            html_url:    "https://github.com/o/r/issues/7".into(),
            title:       "Crash, again".into(),
            description: "boom".into(),
            true_label:  "bug".into(),
            pred_label:  "feature".into(),
        };

        w.write_predictions(&[record.clone(), record.clone()]).unwrap();
        let path = w.write_predictions(&[record]).unwrap();

        let mut r = csv::Reader::from_path(path).unwrap();
        let rows: Vec<PredictionRecord> = r.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Crash, again");
        let headers: Vec<&str> = r.headers().unwrap().iter().collect();
        assert_eq!(
            headers,
            vec!["number", "html_url", "title", "description", "true_label", "pred_label"]
        );
    }
}
