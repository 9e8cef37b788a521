// ============================================================
// Layer 3 — Label Set
// ============================================================
// The sorted, de-duplicated set of labels observed across the
// train / valid / test partitions. Position in the sorted list
// is the class index used for the loss and for every report.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::issue::Issue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelIndex {
    labels: Vec<String>,
}

impl LabelIndex {
    /// Build the index from any number of partitions.
    pub fn from_partitions(partitions: &[&[Issue]]) -> Self {
        let set: BTreeSet<&str> = partitions
            .iter()
            .flat_map(|p| p.iter().map(|i| i.label.as_str()))
            .collect();
        Self {
            labels: set.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self { labels: set.into_iter().collect() }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.binary_search_by(|l| l.as_str().cmp(label)).ok()
    }

    pub fn label_of(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Labels of the index that never occur in `partition`.
    pub fn missing_from(&self, partition: &[Issue]) -> Vec<&str> {
        let present: BTreeSet<&str> = partition.iter().map(|i| i.label.as_str()).collect();
        self.labels
            .iter()
            .map(String::as_str)
            .filter(|l| !present.contains(l))
            .collect()
    }
}

/// Per-label frequency of a partition, in label order.
pub fn count_labels(partition: &[Issue]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for issue in partition {
        *counts.entry(issue.label.as_str()).or_insert(0) += 1;
    }
    counts
}
