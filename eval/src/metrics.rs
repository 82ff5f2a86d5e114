// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation metrics for binary spam classification
//!
//! Implements standard ML metrics:
//! - Confusion Matrix (rows = true class, columns = predicted, [Not Spam, Spam])
//! - Accuracy, Precision, Recall, F1-Score
//! - ROC curve and AUC from positive-class probabilities
//! - Matthews Correlation Coefficient (MCC), Brier score
//!
//! Every ratio with a zero denominator is reported as 0.

use crate::classifiers::{SpamClassifier, DECISION_THRESHOLD};
use crate::datasets::Label;
use crate::error::{Result, SpamEvalError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Confusion matrix for binary classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// True Positives (spam predicted as spam)
    pub tp: usize,
    /// True Negatives (ham predicted as ham)
    pub tn: usize,
    /// False Positives (ham predicted as spam)
    pub fp: usize,
    /// False Negatives (spam predicted as ham)
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Create from encoded predictions and ground truth labels
    pub fn from_predictions(predictions: &[u8], ground_truth: &[u8]) -> Result<Self> {
        check_lengths("predictions vs ground truth", predictions.len(), ground_truth.len())?;
        check_binary(predictions)?;
        check_binary(ground_truth)?;

        let mut matrix = Self::default();
        for (pred, truth) in predictions.iter().zip(ground_truth.iter()) {
            match (pred, truth) {
                (1, 1) => matrix.tp += 1,
                (0, 0) => matrix.tn += 1,
                (1, _) => matrix.fp += 1,
                _ => matrix.fn_ += 1,
            }
        }
        Ok(matrix)
    }

    /// Count table, `[true class][predicted class]` in [Not Spam, Spam] order
    pub fn as_table(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    /// Total number of samples
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Accuracy: (TP + TN) / Total
    pub fn accuracy(&self) -> f64 {
        ratio((self.tp + self.tn) as f64, self.total() as f64)
    }

    /// Precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fp) as f64)
    }

    /// Recall (Sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fn_) as f64)
    }

    /// Specificity: TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        ratio(self.tn as f64, (self.tn + self.fp) as f64)
    }

    /// Negative predictive value: TN / (TN + FN)
    pub fn negative_predictive_value(&self) -> f64 {
        ratio(self.tn as f64, (self.tn + self.fn_) as f64)
    }

    /// F1 Score: 2 * (Precision * Recall) / (Precision + Recall)
    pub fn f1_score(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        ratio(2.0 * precision * recall, precision + recall)
    }

    /// Matthews Correlation Coefficient, -1 to 1
    pub fn mcc(&self) -> f64 {
        let tp = self.tp as f64;
        let tn = self.tn as f64;
        let fp = self.fp as f64;
        let fn_ = self.fn_ as f64;

        let numerator = tp * tn - fp * fn_;
        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        ratio(numerator, denominator)
    }

    /// Balanced Accuracy: (Sensitivity + Specificity) / 2
    pub fn balanced_accuracy(&self) -> f64 {
        (self.recall() + self.specificity()) / 2.0
    }
}

/// Full classification report with all metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub confusion_matrix: ConfusionMatrix,
    pub accuracy: f64,
    pub balanced_accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub mcc: f64,
    pub specificity: f64,
    pub support: usize,
}

impl ClassificationReport {
    /// Generate full report from confusion matrix
    pub fn from_confusion_matrix(cm: ConfusionMatrix) -> Self {
        Self {
            accuracy: cm.accuracy(),
            balanced_accuracy: cm.balanced_accuracy(),
            precision: cm.precision(),
            recall: cm.recall(),
            f1_score: cm.f1_score(),
            mcc: cm.mcc(),
            specificity: cm.specificity(),
            support: cm.total(),
            confusion_matrix: cm,
        }
    }

    pub fn from_predictions(predictions: &[u8], ground_truth: &[u8]) -> Result<Self> {
        let cm = ConfusionMatrix::from_predictions(predictions, ground_truth)?;
        Ok(Self::from_confusion_matrix(cm))
    }

    /// Format as a human-readable string
    pub fn format(&self) -> String {
        let [[tn, fp], [fn_, tp]] = self.confusion_matrix.as_table();
        format!(
            r#"Classification Report
=====================
Accuracy:          {:.4} ({:.2}%)
Balanced Accuracy: {:.4} ({:.2}%)
Precision:         {:.4} ({:.2}%)
Recall:            {:.4} ({:.2}%)
F1 Score:          {:.4} ({:.2}%)
MCC:               {:.4}
Specificity:       {:.4}
Support:           {}

Confusion Matrix:
                   Predicted
                   Not Spam      Spam
Actual Not Spam  {:>8}  {:>8}
       Spam      {:>8}  {:>8}
"#,
            self.accuracy, self.accuracy * 100.0,
            self.balanced_accuracy, self.balanced_accuracy * 100.0,
            self.precision, self.precision * 100.0,
            self.recall, self.recall * 100.0,
            self.f1_score, self.f1_score * 100.0,
            self.mcc,
            self.specificity,
            self.support,
            tn, fp,
            fn_, tp,
        )
    }
}

/// A single point on the ROC curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    /// Score threshold at which this point is computed, `None` for the
    /// (0, 0) anchor that sits above every score
    pub threshold: Option<f64>,
    /// False positive rate: FP / (FP + TN)
    pub fpr: f64,
    /// True positive rate: TP / (TP + FN)
    pub tpr: f64,
}

/// ROC curve with AUC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    /// Points from (0, 0) to (1, 1)
    pub points: Vec<RocPoint>,
    /// Area under the curve (trapezoidal rule)
    pub auc: f64,
}

impl RocCurve {
    /// Threshold sweep over scores sorted descending, ties grouped.
    ///
    /// Returns `None` when either class is absent, since one of the rates
    /// is then undefined at every threshold.
    pub fn from_scores(ground_truth: &[u8], scores: &[f64]) -> Result<Option<Self>> {
        check_lengths("ground truth vs scores", ground_truth.len(), scores.len())?;
        check_binary(ground_truth)?;

        let n_pos = ground_truth.iter().filter(|&&l| l == 1).count();
        let n_neg = ground_truth.len() - n_pos;
        if n_pos == 0 || n_neg == 0 {
            return Ok(None);
        }

        let mut pairs: Vec<(u8, f64)> = ground_truth
            .iter()
            .copied()
            .zip(scores.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let p = n_pos as f64;
        let n = n_neg as f64;

        let mut points = vec![RocPoint {
            threshold: None,
            fpr: 0.0,
            tpr: 0.0,
        }];

        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut i = 0;
        while i < pairs.len() {
            // Accumulate all samples sharing this score
            let current = pairs[i].1;
            while i < pairs.len() && pairs[i].1 == current {
                if pairs[i].0 == 1 {
                    tp += 1;
                } else {
                    fp += 1;
                }
                i += 1;
            }
            points.push(RocPoint {
                threshold: Some(current),
                fpr: fp as f64 / n,
                tpr: tp as f64 / p,
            });
        }

        let auc = points
            .windows(2)
            .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
            .sum();

        Ok(Some(Self { points, auc }))
    }

    /// `(fpr, tpr)` pairs in curve order
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| (p.fpr, p.tpr)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Headline scores as percentages, for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPercentages {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Complete evaluation metrics including probabilistic metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub classification: ClassificationReport,
    /// ROC curve (absent when the test set holds a single class)
    pub roc_curve: Option<RocCurve>,
    /// Brier score (calibration metric)
    pub brier_score: f64,
    /// Per-class metrics keyed by display name
    pub per_class: BTreeMap<String, ClassMetrics>,
}

impl EvaluationMetrics {
    /// Threshold scores at 0.5 and compute every metric
    pub fn from_scores(ground_truth: &[u8], scores: &[f64]) -> Result<Self> {
        check_lengths("ground truth vs scores", ground_truth.len(), scores.len())?;

        let predictions: Vec<u8> = scores
            .iter()
            .map(|&p| u8::from(p > DECISION_THRESHOLD))
            .collect();
        let classification = ClassificationReport::from_predictions(&predictions, ground_truth)?;
        let cm = classification.confusion_matrix;

        let mut per_class = BTreeMap::new();
        per_class.insert(
            Label::Spam.display_name().to_string(),
            ClassMetrics {
                precision: classification.precision,
                recall: classification.recall,
                f1_score: classification.f1_score,
                support: cm.tp + cm.fn_,
            },
        );

        // Not Spam class (swap TP/TN, FP/FN perspective)
        let ham_precision = cm.negative_predictive_value();
        let ham_recall = cm.specificity();
        per_class.insert(
            Label::Ham.display_name().to_string(),
            ClassMetrics {
                precision: ham_precision,
                recall: ham_recall,
                f1_score: ratio(2.0 * ham_precision * ham_recall, ham_precision + ham_recall),
                support: cm.tn + cm.fp,
            },
        );

        let roc_curve = RocCurve::from_scores(ground_truth, scores)?;
        if roc_curve.is_none() {
            tracing::warn!("ROC curve undefined: test labels contain a single class");
        }

        Ok(Self {
            classification,
            roc_curve,
            brier_score: Self::calculate_brier_score(ground_truth, scores),
            per_class,
        })
    }

    pub fn auc(&self) -> Option<f64> {
        self.roc_curve.as_ref().map(|roc| roc.auc)
    }

    pub fn percentages(&self) -> MetricPercentages {
        MetricPercentages {
            accuracy: self.classification.accuracy * 100.0,
            precision: self.classification.precision * 100.0,
            recall: self.classification.recall * 100.0,
            f1_score: self.classification.f1_score * 100.0,
        }
    }

    /// Calculate Brier score (lower is better)
    fn calculate_brier_score(ground_truth: &[u8], scores: &[f64]) -> f64 {
        let sum: f64 = ground_truth
            .iter()
            .zip(scores)
            .map(|(&label, &p)| (p - label as f64).powi(2))
            .sum();
        ratio(sum, ground_truth.len() as f64)
    }

    /// Format as human-readable string
    pub fn format(&self) -> String {
        let mut output = self.classification.format();

        match self.auc() {
            Some(auc) => output.push_str(&format!("\nAUC-ROC:           {:.4}\n", auc)),
            None => output.push_str("\nAUC-ROC:           undefined (single-class test set)\n"),
        }
        output.push_str(&format!("Brier Score:       {:.4}\n", self.brier_score));

        output.push_str("\nPer-Class Metrics:\n");
        for (class, metrics) in &self.per_class {
            output.push_str(&format!(
                "  {}: P={:.4} R={:.4} F1={:.4} (n={})\n",
                class, metrics.precision, metrics.recall, metrics.f1_score, metrics.support
            ));
        }

        output
    }
}

/// Score a trained model on held-out texts and encoded labels
pub fn evaluate(
    model: &dyn SpamClassifier,
    texts: &[String],
    labels: &[u8],
) -> Result<EvaluationMetrics> {
    check_lengths("test texts vs labels", texts.len(), labels.len())?;
    let scores = model.predict_proba(texts);
    let metrics = EvaluationMetrics::from_scores(labels, &scores)?;

    tracing::info!(
        "{} - Accuracy: {:.4}, Precision: {:.4}, Recall: {:.4}, F1: {:.4}",
        model.name(),
        metrics.classification.accuracy,
        metrics.classification.precision,
        metrics.classification.recall,
        metrics.classification.f1_score
    );

    Ok(metrics)
}

fn check_lengths(what: &'static str, left: usize, right: usize) -> Result<()> {
    if left != right {
        return Err(SpamEvalError::LengthMismatch { what, left, right });
    }
    Ok(())
}

fn check_binary(values: &[u8]) -> Result<()> {
    match values.iter().find(|&&v| v > 1) {
        Some(&bad) => Err(SpamEvalError::InvalidEncodedLabel(bad)),
        None => Ok(()),
    }
}
