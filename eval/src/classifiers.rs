// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Spam classifiers behind a common fit-once, predict-many interface
//!
//! Implements:
//! - Multinomial Naive Bayes over bag-of-words counts
//!
//! SVM and Random Forest are selectable names only and fail explicitly
//! when trained.

use crate::datasets::Label;
use crate::error::{Result, SpamEvalError};
use crate::vectorizer::{CountVectorizer, SparseCounts};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Positive-class probability above which a prediction is spam
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Prediction output from a classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    pub probability: f64, // P(spam)
}

impl Prediction {
    pub fn from_probability(probability: f64) -> Self {
        Self {
            label: if probability > DECISION_THRESHOLD {
                Label::Spam
            } else {
                Label::Ham
            },
            probability,
        }
    }
}

/// Trait for all trained spam classifiers
pub trait SpamClassifier: Send + Sync {
    /// P(spam) for each text
    fn predict_proba(&self, texts: &[String]) -> Vec<f64>;

    /// Hard class indices (0 = ham, 1 = spam)
    fn predict(&self, texts: &[String]) -> Vec<u8> {
        self.predict_batch(texts)
            .iter()
            .map(|p| p.label.to_binary())
            .collect()
    }

    fn predict_batch(&self, texts: &[String]) -> Vec<Prediction> {
        self.predict_proba(texts)
            .into_iter()
            .map(Prediction::from_probability)
            .collect()
    }

    /// Get model name
    fn name(&self) -> &str;

    /// Get model description
    fn description(&self) -> &str;

    /// Tokens pushing predictions toward `label`, strongest first.
    /// Models without token-level weights return nothing.
    fn indicative_tokens(&self, _label: Label, _n: usize) -> Vec<(String, f64)> {
        Vec::new()
    }
}

/// Selectable learning algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    NaiveBayes,
    Svm,
    RandomForest,
}

impl Algorithm {
    pub fn all() -> &'static [Algorithm] {
        &[Algorithm::NaiveBayes, Algorithm::Svm, Algorithm::RandomForest]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Algorithm::NaiveBayes => "Naive Bayes",
            Algorithm::Svm => "SVM",
            Algorithm::RandomForest => "Random Forest",
        }
    }

    pub fn is_implemented(&self) -> bool {
        matches!(self, Algorithm::NaiveBayes)
    }

    /// Fail with `UnsupportedAlgorithm` unless a trainer exists
    pub fn ensure_supported(&self) -> Result<()> {
        if self.is_implemented() {
            Ok(())
        } else {
            Err(SpamEvalError::UnsupportedAlgorithm(self.display_name().to_string()))
        }
    }

    /// Fit a classifier on preprocessed texts and encoded labels
    pub fn train(&self, texts: &[String], labels: &[u8]) -> Result<Box<dyn SpamClassifier>> {
        self.ensure_supported()?;
        match self {
            Algorithm::NaiveBayes => Ok(Box::new(NaiveBayesModel::train(texts, labels)?)),
            Algorithm::Svm | Algorithm::RandomForest => {
                Err(SpamEvalError::UnsupportedAlgorithm(self.display_name().to_string()))
            }
        }
    }
}

impl FromStr for Algorithm {
    type Err = SpamEvalError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "naivebayes" | "nb" => Ok(Algorithm::NaiveBayes),
            "svm" => Ok(Algorithm::Svm),
            "randomforest" | "rf" => Ok(Algorithm::RandomForest),
            _ => Err(SpamEvalError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Multinomial Naive Bayes with additive smoothing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNb {
    alpha: f64,
    /// ln P(class), indexed by class
    class_log_prior: [f64; 2],
    /// ln P(feature | class), indexed by class then feature
    feature_log_prob: [Vec<f64>; 2],
    class_count: [usize; 2],
}

impl MultinomialNb {
    pub const DEFAULT_ALPHA: f64 = 1.0;

    /// Fit on count vectors; both classes must be present
    pub fn fit(x: &[SparseCounts], y: &[u8], n_features: usize, alpha: f64) -> Self {
        let mut class_count = [0usize; 2];
        let mut feature_count = [vec![0.0f64; n_features], vec![0.0f64; n_features]];

        for (row, &class) in x.iter().zip(y) {
            let c = class as usize;
            class_count[c] += 1;
            for &(idx, count) in row {
                feature_count[c][idx] += count as f64;
            }
        }

        let n_samples = (class_count[0] + class_count[1]) as f64;
        let class_log_prior = [
            (class_count[0] as f64 / n_samples).ln(),
            (class_count[1] as f64 / n_samples).ln(),
        ];

        let feature_log_prob = feature_count.map(|counts| {
            let total: f64 = counts.iter().sum::<f64>() + alpha * n_features as f64;
            counts.iter().map(|&c| ((c + alpha) / total).ln()).collect::<Vec<f64>>()
        });

        Self {
            alpha,
            class_log_prior,
            feature_log_prob,
            class_count,
        }
    }

    /// Unnormalized ln P(class, x)
    fn joint_log_likelihood(&self, x: &SparseCounts) -> [f64; 2] {
        let mut jll = self.class_log_prior;
        for (c, score) in jll.iter_mut().enumerate() {
            for &(idx, count) in x {
                *score += count as f64 * self.feature_log_prob[c][idx];
            }
        }
        jll
    }

    /// P(spam | x) via log-sum-exp normalization
    pub fn predict_proba_one(&self, x: &SparseCounts) -> f64 {
        let [ham, spam] = self.joint_log_likelihood(x);
        let max = ham.max(spam);
        let ham_exp = (ham - max).exp();
        let spam_exp = (spam - max).exp();
        spam_exp / (ham_exp + spam_exp)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn class_count(&self) -> [usize; 2] {
        self.class_count
    }

    /// ln P(feature | spam) - ln P(feature | ham)
    pub fn log_ratio(&self, idx: usize) -> f64 {
        self.feature_log_prob[1][idx] - self.feature_log_prob[0][idx]
    }
}

/// Count vectorizer and Naive Bayes fit together on the same training texts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    vectorizer: CountVectorizer,
    classifier: MultinomialNb,
}

impl NaiveBayesModel {
    pub fn train(texts: &[String], labels: &[u8]) -> Result<Self> {
        validate_training_data(texts, labels)?;

        let mut vectorizer = CountVectorizer::new();
        let x = vectorizer.fit_transform(texts);
        let classifier = MultinomialNb::fit(
            &x,
            labels,
            vectorizer.vocabulary_size(),
            MultinomialNb::DEFAULT_ALPHA,
        );

        let [n_ham, n_spam] = classifier.class_count();
        tracing::info!(
            "Trained Naive Bayes on {} texts ({} ham, {} spam), vocabulary={}, alpha={}",
            texts.len(),
            n_ham,
            n_spam,
            vectorizer.vocabulary_size(),
            classifier.alpha()
        );

        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    pub fn vectorizer(&self) -> &CountVectorizer {
        &self.vectorizer
    }
}

impl SpamClassifier for NaiveBayesModel {
    fn predict_proba(&self, texts: &[String]) -> Vec<f64> {
        texts
            .iter()
            .map(|t| {
                let x = self.vectorizer.transform_one(t);
                self.classifier.predict_proba_one(&x)
            })
            .collect()
    }

    fn name(&self) -> &str {
        "Naive Bayes"
    }

    fn description(&self) -> &str {
        "Bag-of-words counts with multinomial Naive Bayes (alpha=1.0)"
    }

    fn indicative_tokens(&self, label: Label, n: usize) -> Vec<(String, f64)> {
        let sign = if label == Label::Spam { 1.0 } else { -1.0 };
        let mut scored: Vec<(String, f64)> = self
            .vectorizer
            .vocabulary()
            .iter()
            .map(|(token, &idx)| (token.clone(), sign * self.classifier.log_ratio(idx)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(n);
        scored
    }
}

/// Reject training sets a binary classifier cannot learn from.
///
/// A single-class training set is refused rather than fit, since the model
/// would predict that class for every input.
fn validate_training_data(texts: &[String], labels: &[u8]) -> Result<()> {
    if texts.len() != labels.len() {
        return Err(SpamEvalError::LengthMismatch {
            what: "training texts vs labels",
            left: texts.len(),
            right: labels.len(),
        });
    }
    if texts.is_empty() {
        return Err(SpamEvalError::EmptyTrainingSet("no training texts".to_string()));
    }
    if let Some(&bad) = labels.iter().find(|&&l| l > 1) {
        return Err(SpamEvalError::InvalidEncodedLabel(bad));
    }

    let first = labels[0];
    if labels.iter().all(|&l| l == first) {
        let label = Label::from_binary(first);
        tracing::warn!(
            "Refusing to train: all {} training labels are '{}'",
            labels.len(),
            label
        );
        return Err(SpamEvalError::EmptyTrainingSet(format!(
            "all {} training labels are '{}', both classes are required",
            labels.len(),
            label
        )));
    }
    Ok(())
}
