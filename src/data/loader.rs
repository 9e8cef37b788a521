// ============================================================
// Layer 4 — Issue Loader
// ============================================================
// Loads a JSON array of labelled issues from disk.
//
// A missing file or malformed JSON is a data error: the caller
// aborts the run.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::issue::Issue;
use crate::domain::traits::IssueSource;

/// One dataset file holding a JSON array of issues.
pub struct JsonIssueFile {
    path: PathBuf,
}

impl JsonIssueFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IssueSource for JsonIssueFile {
    fn load_all(&self) -> Result<Vec<Issue>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read dataset '{}'", self.path.display()))?;

        let issues: Vec<Issue> = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed issue JSON in '{}'", self.path.display()))?;

        tracing::debug!("Loaded {} issues from '{}'", issues.len(), self.path.display());
        Ok(issues)
    }
}
