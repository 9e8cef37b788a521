// ============================================================
// Layer 4 — Split Resolver
// ============================================================
// Turns the three dataset paths into train / valid / test
// partitions plus the global label set.
//
//   train == valid == test → load once, stratified 70/30 into
//                            (pool, test), then 80/20 of the
//                            pool into (train, valid)
//   train == valid != test → load train once, stratified 80/20
//                            into (train, valid); load test
//   otherwise              → load all three as given
//
// Externally supplied partitions are not checked for overlap.
// The train file as loaded, before any split, is kept as the
// corpus word vocabularies are counted over.

use anyhow::{Context, Result};
use std::path::Path;

use crate::data::loader::JsonIssueFile;
use crate::data::splitter::stratified_split;
use crate::domain::issue::Issue;
use crate::domain::label_set::{count_labels, LabelIndex};
use crate::domain::traits::IssueSource;

/// Seed used by every split of the experiment driver.
pub const SPLIT_SEED: u64 = 42;

const TEST_FRACTION: f64 = 0.3;
const VALID_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// One file split into all three partitions
    SingleFile,
    /// One file split into train/valid, separate test file
    SharedTrainValid,
    /// Three files used verbatim
    Explicit,
}

impl SplitMode {
    pub fn detect(train: &Path, valid: &Path, test: &Path) -> Self {
        if train == valid && train == test {
            Self::SingleFile
        } else if train == valid {
            Self::SharedTrainValid
        } else {
            Self::Explicit
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedSplits {
    pub train:  Vec<Issue>,
    pub valid:  Vec<Issue>,
    pub test:   Vec<Issue>,
    pub labels: LabelIndex,
    /// Every issue of the train file, before splitting
    pub train_corpus: Vec<Issue>,
}

/// Load and partition the datasets named by the three paths.
pub fn resolve_splits(train: &Path, valid: &Path, test: &Path, seed: u64) -> Result<ResolvedSplits> {
    let mode = SplitMode::detect(train, valid, test);
    let by_label = |i: &Issue| i.label.clone();

    let (train_corpus, train_set, valid_set, test_set) = match mode {
        SplitMode::SingleFile => {
            let all = JsonIssueFile::new(train).load_all()?;
            let corpus = all.clone();
            let (pool, test_set) = stratified_split(all, by_label, TEST_FRACTION, seed)
                .with_context(|| format!("Cannot split '{}' into train/test", train.display()))?;
            let (train_set, valid_set) = stratified_split(pool, by_label, VALID_FRACTION, seed)
                .with_context(|| format!("Cannot split '{}' into train/valid", train.display()))?;
            (corpus, train_set, valid_set, test_set)
        }
        SplitMode::SharedTrainValid => {
            let all = JsonIssueFile::new(train).load_all()?;
            let corpus = all.clone();
            let (train_set, valid_set) = stratified_split(all, by_label, VALID_FRACTION, seed)
                .with_context(|| format!("Cannot split '{}' into train/valid", train.display()))?;
            let test_set = JsonIssueFile::new(test).load_all()?;
            (corpus, train_set, valid_set, test_set)
        }
        SplitMode::Explicit => {
            let train_set = JsonIssueFile::new(train).load_all()?;
            (
                train_set.clone(),
                train_set,
                JsonIssueFile::new(valid).load_all()?,
                JsonIssueFile::new(test).load_all()?,
            )
        }
    };

    for (name, partition) in [("train", &train_set), ("val", &valid_set), ("test", &test_set)] {
        println!("label count for {name} dataset");
        println!("{:#?}", count_labels(partition));
    }

    let labels = LabelIndex::from_partitions(&[&train_set[..], &valid_set[..], &test_set[..]]);
    println!("all_labels:{:?}", labels.labels());

    let untrained = labels.missing_from(&train_set);
    if !untrained.is_empty() {
        tracing::warn!("Labels with no training examples: {:?}", untrained);
    }

    tracing::info!(
        "Resolved splits ({:?}): {} train, {} valid, {} test, {} labels",
        mode,
        train_set.len(),
        valid_set.len(),
        test_set.len(),
        labels.len(),
    );

    Ok(ResolvedSplits {
        train: train_set,
        valid: valid_set,
        test: test_set,
        labels,
        train_corpus,
    })
}
