// ============================================================
// Layer 5 — Batched Inference & Reporting
// ============================================================
// Predicts every test issue from its full evaluation text
// (title, details, comments), in fixed-size micro-batches:
//
//   for each issue:
//     compose text → encode, truncate + pad to 512 → buffer
//     buffer full, or last issue → one forward pass, arg-max
//
// N issues therefore take exactly ceil(N / micro_batch) passes.
// The predictions are scored into a ClassificationReport over
// the full label index and flattened into PredictionRecords.

use anyhow::{anyhow, Result};
use burn::prelude::*;
use std::marker::PhantomData;

use crate::data::batcher::EncodedBatch;
use crate::data::tokenizer::{IssueTokenizer, MAX_SEQ_LEN};
use crate::domain::encoded::EncodedText;
use crate::domain::issue::Issue;
use crate::domain::label_set::LabelIndex;
use crate::domain::report::{ClassificationReport, PredictionRecord};
use crate::domain::traits::IssueClassifier;
use crate::ml::model::IssueModel;

/// Issues per forward pass at prediction time.
pub const MICRO_BATCH_SIZE: usize = 8;

// ─── BurnClassifier ───────────────────────────────────────────────────────────
/// Adapts any trained IssueModel to the IssueClassifier seam.
pub struct BurnClassifier<B: Backend, M: IssueModel<B>> {
    model:    M,
    device:   B::Device,
    _backend: PhantomData<B>,
}

impl<B: Backend, M: IssueModel<B>> BurnClassifier<B, M> {
    pub fn new(model: M, device: B::Device) -> Self {
        Self { model, device, _backend: PhantomData }
    }
}

impl<B: Backend, M: IssueModel<B>> IssueClassifier for BurnClassifier<B, M> {
    fn predict(&self, batch: &[EncodedText]) -> Result<Vec<usize>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let logits = self.model.forward(EncodedBatch::stack(batch, &self.device));
        let predicted = logits.argmax(1).flatten::<1>(0, 1);
        Ok(predicted.into_data().iter::<i64>().map(|v| v as usize).collect())
    }
}

// ─── predict_and_report ───────────────────────────────────────────────────────
pub fn predict_and_report<C: IssueClassifier>(
    classifier:  &C,
    tokenizer:   &IssueTokenizer,
    test:        &[Issue],
    labels:      &LabelIndex,
    micro_batch: usize,
) -> Result<(ClassificationReport, Vec<PredictionRecord>)> {
    let micro_batch = micro_batch.max(1);
    let mut truth = Vec::with_capacity(test.len());
    let mut predicted = Vec::with_capacity(test.len());
    let mut buffer: Vec<EncodedText> = Vec::with_capacity(micro_batch);

    for (i, issue) in test.iter().enumerate() {
        let label = labels
            .index_of(&issue.label)
            .ok_or_else(|| anyhow!("Issue #{} has unindexed label '{}'", issue.number, issue.label))?;
        truth.push(label);
        buffer.push(tokenizer.encode_padded(&tokenizer.compose(issue), MAX_SEQ_LEN)?);

        if buffer.len() == micro_batch || i + 1 == test.len() {
            let batch_predictions = classifier.predict(&buffer)?;
            if batch_predictions.len() != buffer.len() {
                return Err(anyhow!(
                    "Classifier returned {} predictions for {} issues",
                    batch_predictions.len(),
                    buffer.len()
                ));
            }
            predicted.extend(batch_predictions);
            buffer.clear();
        }
    }

    let records = test
        .iter()
        .zip(&predicted)
        .map(|(issue, &p)| {
            let pred_label = labels
                .label_of(p)
                .ok_or_else(|| anyhow!("Predicted class {p} is outside the label index"))?;
            Ok(PredictionRecord {
                number:      issue.number,
                html_url:    issue.html_url.clone(),
                title:       issue.title.clone(),
                description: issue.description.clone(),
                true_label:  issue.label.clone(),
                pred_label:  pred_label.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let report = ClassificationReport::compute(&truth, &predicted, labels);
    tracing::info!("Predicted {} issues (accuracy {:.4})", records.len(), report.accuracy);
    Ok((report, records))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model_spec::{TokenizerClass, TokenizerFamily};
    use crate::infra::tokenizer_store::word_level_tokenizer;
    use std::cell::RefCell;

    /// Records the size of every forward pass; predicts class 0.
    #[derive(Default)]
    struct CountingClassifier {
        passes: RefCell<Vec<usize>>,
    }

    impl IssueClassifier for CountingClassifier {
        fn predict(&self, batch: &[EncodedText]) -> Result<Vec<usize>> {
            assert!(batch.iter().all(|e| e.len() == MAX_SEQ_LEN));
            self.passes.borrow_mut().push(batch.len());
            Ok(vec![0; batch.len()])
        }
    }

    fn tokenizer() -> IssueTokenizer {
        let inner = word_level_tokenizer(&["crash".to_string()]).unwrap();
        IssueTokenizer::new(TokenizerClass::WordVocabulary, TokenizerFamily::WordLevel, inner, true).unwrap()
    }

    fn issues(n: usize) -> Vec<Issue> {
        (0..n)
            .map(|i| Issue::new(i as u64, "crash", "details", if i % 2 == 0 { "bug" } else { "feature" }))
            .collect()
    }

    #[test]
    fn test_forward_pass_count() {
        let labels = LabelIndex::from_labels(["bug", "feature"]);
        let tok = tokenizer();
        for n in [0usize, 1, 7, 8, 9, 16, 17] {
            let classifier = CountingClassifier::default();
            let (_, records) =
                predict_and_report(&classifier, &tok, &issues(n), &labels, MICRO_BATCH_SIZE).unwrap();

            let passes = classifier.passes.borrow();
            assert_eq!(passes.len(), n.div_ceil(MICRO_BATCH_SIZE), "passes for n={n}");
            assert_eq!(passes.iter().sum::<usize>(), n);
            assert!(passes.iter().all(|&size| (1..=MICRO_BATCH_SIZE).contains(&size)));
            assert_eq!(records.len(), n);
        }
    }

    #[test]
    fn test_remainder_batch_size() {
        let labels = LabelIndex::from_labels(["bug", "feature"]);
        let classifier = CountingClassifier::default();
        predict_and_report(&classifier, &tokenizer(), &issues(17), &labels, 8).unwrap();
        assert_eq!(*classifier.passes.borrow(), vec![8, 8, 1]);
    }

    #[test]
    fn test_report_and_records() {
        let labels = LabelIndex::from_labels(["bug", "feature", "question"]);
        let classifier = CountingClassifier::default();
        let test = issues(4);
        let (report, records) = predict_and_report(&classifier, &tokenizer(), &test, &labels, 8).unwrap();

        assert_eq!(report.per_class.len(), 3);
        assert_eq!(report.per_class[0].1.support, 2);
        assert!((report.accuracy - 0.5).abs() < 1e-9);
        assert_eq!(records[1].true_label, "feature");
        assert_eq!(records[1].pred_label, "bug");
        assert_eq!(records[3].html_url, test[3].html_url);
    }

    #[test]
    fn test_out_of_range_prediction_is_an_error() {
        struct Wild;
        impl IssueClassifier for Wild {
            fn predict(&self, batch: &[EncodedText]) -> Result<Vec<usize>> {
                Ok(vec![9; batch.len()])
            }
        }
        let labels = LabelIndex::from_labels(["bug", "feature"]);
        assert!(predict_and_report(&Wild, &tokenizer(), &issues(2), &labels, 8).is_err());
    }

    #[test]
    fn test_burn_classifier_predicts_one_class_per_issue() {
        use crate::ml::word_models::TextCnnConfig;
        use burn::backend::NdArray;

        let device = Default::default();
        let model = TextCnnConfig::new(4, 3).with_embed_dim(8).with_num_filters(2).init::<NdArray>(&device, None);
        let classifier = BurnClassifier::<NdArray, _>::new(model, device);
        let batch = vec![EncodedText::new(vec![2; 8], None), EncodedText::new(vec![3; 8], None)];

        let predicted = classifier.predict(&batch).unwrap();
        assert_eq!(predicted.len(), 2);
        assert!(predicted.iter().all(|&p| p < 3));
    }
}
