// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation toolkit for email spam classification
//!
//! This crate provides:
//! - A registry of text cleaning steps and an ordered preprocessing pipeline
//! - Dataset loading and cleaning (Spam Assassin, EnronSpam, LingSpam, synthetic)
//! - Seeded train/test splitting and label encoding
//! - Bag-of-words features with multinomial Naive Bayes
//! - Evaluation metrics (Accuracy, Precision, Recall, F1, ROC/AUC)
//! - Dataset exploration profiles
//! - Reproducible evaluation pipeline with seeded randomness

pub mod classifiers;
pub mod cleaning;
pub mod datasets;
pub mod error;
pub mod exploration;
pub mod metrics;
pub mod pipeline;
pub mod preprocess;
pub mod split;
pub mod vectorizer;

pub use classifiers::{Algorithm, MultinomialNb, NaiveBayesModel, Prediction, SpamClassifier};
pub use cleaning::CleaningStep;
pub use datasets::{Dataset, DatasetCleaner, DatasetId, Label, RawTable, Sample};
pub use error::{Result, SpamEvalError};
pub use exploration::{DatasetProfile, ProfileComparison};
pub use metrics::{evaluate, ClassificationReport, ConfusionMatrix, EvaluationMetrics, RocCurve};
pub use pipeline::{EvaluationConfig, EvaluationPipeline, EvaluationResults};
pub use preprocess::Pipeline;
pub use split::{train_test_split, LabelEncoder, Split};
pub use vectorizer::CountVectorizer;
