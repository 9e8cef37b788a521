// ============================================================
// Layer 3 — Classification Report
// ============================================================
// Per-class precision / recall / F1 / support over an explicit
// label ordering, plus the accuracy, macro and weighted rows.
// Classes with no predictions (or no true examples) score 0.
//
// Also defines the two row types written to disk:
//   ReportRow        — one line of the per-class report CSV
//   PredictionRecord — one line of the per-issue prediction CSV

use serde::{Deserialize, Serialize};

use crate::domain::label_set::LabelIndex;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassScores {
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    /// One entry per label, in label-index order
    pub per_class:    Vec<(String, ClassScores)>,
    pub accuracy:     f64,
    pub macro_avg:    ClassScores,
    pub weighted_avg: ClassScores,
    pub micro_f1:     f64,
}

/// The six aggregate numbers recorded per checkpoint in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub accuracy:    f64,
    pub precision:   f64,
    pub recall:      f64,
    pub f1_macro:    f64,
    pub f1_weighted: f64,
    pub f1_micro:    f64,
}

impl ClassificationReport {
    /// Score `predicted` against `truth`; both hold class indices.
    pub fn compute(truth: &[usize], predicted: &[usize], labels: &LabelIndex) -> Self {
        let n_classes = labels.len();
        let mut tp = vec![0usize; n_classes];
        let mut predicted_count = vec![0usize; n_classes];
        let mut true_count = vec![0usize; n_classes];
        let mut correct = 0usize;

        for (&t, &p) in truth.iter().zip(predicted) {
            if t == p {
                correct += 1;
            }
            if let Some(c) = true_count.get_mut(t) {
                *c += 1;
            }
            if let Some(c) = predicted_count.get_mut(p) {
                *c += 1;
            }
            if t == p && t < n_classes {
                tp[t] += 1;
            }
        }

        let per_class: Vec<(String, ClassScores)> = labels
            .labels()
            .iter()
            .enumerate()
            .map(|(c, label)| {
                let precision = ratio(tp[c], predicted_count[c]);
                let recall = ratio(tp[c], true_count[c]);
                let scores = ClassScores {
                    precision,
                    recall,
                    f1: harmonic_mean(precision, recall),
                    support: true_count[c],
                };
                (label.clone(), scores)
            })
            .collect();

        let total_support: usize = true_count.iter().sum();
        let macro_avg = average(&per_class, total_support, |_| 1.0);
        let weighted_avg = average(&per_class, total_support, |s| s.support as f64);

        let tp_sum: usize = tp.iter().sum();
        let micro_precision = ratio(tp_sum, predicted_count.iter().sum());
        let micro_recall = ratio(tp_sum, total_support);

        Self {
            per_class,
            accuracy: ratio(correct, truth.len().min(predicted.len())),
            macro_avg,
            weighted_avg,
            micro_f1: harmonic_mean(micro_precision, micro_recall),
        }
    }

    pub fn summary(&self) -> SummaryMetrics {
        SummaryMetrics {
            accuracy:    self.accuracy,
            precision:   self.macro_avg.precision,
            recall:      self.macro_avg.recall,
            f1_macro:    self.macro_avg.f1,
            f1_weighted: self.weighted_avg.f1,
            f1_micro:    self.micro_f1,
        }
    }

    /// Rows in report order: every label, then accuracy, macro avg,
    /// weighted avg. The accuracy row carries the scalar in every column.
    pub fn rows(&self) -> Vec<ReportRow> {
        let mut rows: Vec<ReportRow> = self
            .per_class
            .iter()
            .map(|(label, s)| ReportRow::from_scores(label, s))
            .collect();
        rows.push(ReportRow {
            label:     "accuracy".to_string(),
            precision: self.accuracy,
            recall:    self.accuracy,
            f1_score:  self.accuracy,
            support:   self.accuracy,
        });
        rows.push(ReportRow::from_scores("macro avg", &self.macro_avg));
        rows.push(ReportRow::from_scores("weighted avg", &self.weighted_avg));
        rows
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn harmonic_mean(p: f64, r: f64) -> f64 {
    if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 }
}

fn average(
    per_class: &[(String, ClassScores)],
    total_support: usize,
    weight: impl Fn(&ClassScores) -> f64,
) -> ClassScores {
    let total_weight: f64 = per_class.iter().map(|(_, s)| weight(s)).sum();
    let mean = |f: fn(&ClassScores) -> f64| {
        if total_weight == 0.0 {
            0.0
        } else {
            per_class.iter().map(|(_, s)| f(s) * weight(s)).sum::<f64>() / total_weight
        }
    };
    ClassScores {
        precision: mean(|s| s.precision),
        recall:    mean(|s| s.recall),
        f1:        mean(|s| s.f1),
        support:   total_support,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Index column; its header cell is left blank
    #[serde(rename = "")]
    pub label:     String,
    pub precision: f64,
    pub recall:    f64,
    #[serde(rename = "f1-score")]
    pub f1_score:  f64,
    pub support:   f64,
}

impl ReportRow {
    fn from_scores(label: &str, s: &ClassScores) -> Self {
        Self {
            label:     label.to_string(),
            precision: s.precision,
            recall:    s.recall,
            f1_score:  s.f1,
            support:   s.support as f64,
        }
    }
}

/// One test issue with its true and predicted label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub number:      u64,
    pub html_url:    String,
    pub title:       String,
    pub description: String,
    pub true_label:  String,
    pub pred_label:  String,
}
