// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Reproducible train/evaluate pipeline for spam classification
//!
//! Orchestrates:
//! - Dataset loading and cleaning
//! - Seeded train/test split and label encoding
//! - Preprocessing with the selected cleaning steps
//! - Model training and evaluation
//! - Results serialization and markdown reporting

use crate::classifiers::Algorithm;
use crate::cleaning::CleaningStep;
use crate::datasets::{Dataset, DatasetCleaner, DatasetId, Label, RawTable, Sample};
use crate::error::Result;
use crate::metrics::{evaluate, EvaluationMetrics};
use crate::preprocess::Pipeline;
use crate::split::{check_test_fraction, train_test_split, LabelEncoder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Number of tokens listed per class in results
const INDICATIVE_TOKENS: usize = 10;

/// Configuration for the evaluation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Dataset to evaluate on
    pub dataset: DatasetId,
    /// Directory holding the dataset CSV files
    pub dataset_dir: String,
    /// Learning algorithm
    pub algorithm: Algorithm,
    /// Cleaning step identifiers, applied in order
    pub steps: Vec<String>,
    /// Share of samples held out for testing
    pub test_fraction: f64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Output directory for results
    pub output_dir: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetId::Synthetic,
            dataset_dir: "data".to_string(),
            algorithm: Algorithm::NaiveBayes,
            steps: CleaningStep::all().iter().map(|s| s.name().to_string()).collect(),
            test_fraction: 0.2,
            seed: 42,
            output_dir: "eval/results".to_string(),
        }
    }
}

impl EvaluationConfig {
    /// Load a saved run configuration; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// A sample prediction for inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSample {
    pub id: String,
    pub text_preview: String,
    pub predicted: String,
    pub actual: String,
    pub probability: f64,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub name: String,
    pub total_samples: usize,
    pub dropped_rows: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    pub label_distribution: BTreeMap<String, usize>,
    /// SHA-256 of the cleaned dataset
    pub fingerprint: String,
    pub preprocessing: String,
}

/// Complete evaluation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub config: EvaluationConfig,
    pub dataset_info: DatasetInfo,
    pub model_name: String,
    pub model_description: String,
    pub metrics: EvaluationMetrics,
    pub predictions_sample: Vec<PredictionSample>,
    pub spam_tokens: Vec<(String, f64)>,
    pub ham_tokens: Vec<(String, f64)>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Main evaluation pipeline
pub struct EvaluationPipeline {
    config: EvaluationConfig,
}

impl EvaluationPipeline {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Resolve steps and check algorithm and split before touching any data
    pub fn validate(&self) -> Result<Pipeline> {
        let preprocess = Pipeline::compose(&self.config.steps)?;
        self.config.algorithm.ensure_supported()?;
        check_test_fraction(self.config.test_fraction)?;
        Ok(preprocess)
    }

    /// Load the configured dataset and run the full pipeline
    pub fn run(&self) -> Result<EvaluationResults> {
        let preprocess = self.validate()?;
        let table = self
            .config
            .dataset
            .load(Path::new(&self.config.dataset_dir), self.config.seed)?;
        self.execute(&table, &preprocess)
    }

    /// Run on an already loaded table
    pub fn run_on_table(&self, table: &RawTable) -> Result<EvaluationResults> {
        let preprocess = self.validate()?;
        self.execute(table, &preprocess)
    }

    fn execute(&self, table: &RawTable, preprocess: &Pipeline) -> Result<EvaluationResults> {
        let (dataset, report) = DatasetCleaner::new().clean_with_report(table)?;
        if report.dropped() > 0 {
            tracing::warn!(
                "Dropped {} malformed rows from {}",
                report.dropped(),
                dataset.source()
            );
        }
        tracing::info!(
            "Dataset loaded: {} samples from {}",
            dataset.len(),
            dataset.source()
        );

        let split = train_test_split(&dataset, self.config.test_fraction, self.config.seed)?;

        tracing::info!(
            "Preprocessing with {} steps: {}",
            preprocess.steps().len(),
            preprocess.describe()
        );
        let train_texts = preprocess.apply_all(&bodies(&split.train));
        let test_texts = preprocess.apply_all(&bodies(&split.test));

        let train_labels: Vec<Label> = split.train.iter().map(|s| s.label).collect();
        let test_labels: Vec<Label> = split.test.iter().map(|s| s.label).collect();
        let encoder = LabelEncoder::fit(&train_labels);
        let y_train = encoder.transform(&train_labels)?;
        let y_test = encoder.transform(&test_labels)?;

        tracing::info!("Training {}", self.config.algorithm);
        let model = self.config.algorithm.train(&train_texts, &y_train)?;
        let metrics = evaluate(model.as_ref(), &test_texts, &y_test)?;

        let predictions = model.predict_batch(&test_texts);
        let predictions_sample = sample_predictions(
            split
                .test
                .iter()
                .zip(predictions.iter())
                .map(|(sample, pred)| (sample, pred.label, pred.probability)),
        );

        let dataset_info = DatasetInfo {
            name: dataset.source().to_string(),
            total_samples: dataset.len(),
            dropped_rows: report.dropped(),
            train_samples: split.train.len(),
            test_samples: split.test.len(),
            label_distribution: Dataset::label_distribution(dataset.samples())
                .into_iter()
                .map(|(label, count)| (label.display_name().to_string(), count))
                .collect(),
            fingerprint: dataset.fingerprint(),
            preprocessing: preprocess.describe(),
        };

        Ok(EvaluationResults {
            config: self.config.clone(),
            dataset_info,
            model_name: model.name().to_string(),
            model_description: model.description().to_string(),
            metrics,
            predictions_sample,
            spam_tokens: model.indicative_tokens(Label::Spam, INDICATIVE_TOKENS),
            ham_tokens: model.indicative_tokens(Label::Ham, INDICATIVE_TOKENS),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Save results to JSON file
    pub fn save_results(results: &EvaluationResults, output_path: &Path) -> Result<()> {
        std::fs::create_dir_all(output_path.parent().unwrap_or(Path::new(".")))?;
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(output_path, json)?;
        tracing::info!("Results saved to {}", output_path.display());
        Ok(())
    }

    /// Generate a markdown report
    pub fn generate_report(results: &EvaluationResults) -> String {
        let info = &results.dataset_info;
        let c = &results.metrics.classification;
        let mut report = String::new();

        report.push_str("# Spam Classifier Evaluation Report\n\n");
        report.push_str(&format!("**Generated:** {}\n\n", results.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
        report.push_str(&format!("**Version:** {}\n\n", results.version));

        report.push_str("## Dataset\n\n");
        report.push_str(&format!("- **Name:** {}\n", info.name));
        report.push_str(&format!("- **Total Samples:** {}\n", info.total_samples));
        report.push_str(&format!("- **Dropped Rows:** {}\n", info.dropped_rows));
        report.push_str(&format!(
            "- **Split Sizes:** Train={}, Test={} (seed {})\n",
            info.train_samples, info.test_samples, results.config.seed
        ));
        for (label, count) in &info.label_distribution {
            report.push_str(&format!("- **{}:** {}\n", label, count));
        }
        report.push_str(&format!("- **Fingerprint:** `{}`\n", info.fingerprint));
        report.push_str(&format!("- **Preprocessing:** {}\n\n", info.preprocessing));

        report.push_str("## Summary\n\n");
        report.push_str("| Model | Accuracy | Precision | Recall | F1 Score | AUC-ROC |\n");
        report.push_str("|-------|----------|-----------|--------|----------|---------|\n");
        let auc = results.metrics.auc().map_or("-".to_string(), |v| format!("{:.4}", v));
        report.push_str(&format!(
            "| {} | {:.4} | {:.4} | {:.4} | {:.4} | {} |\n\n",
            results.model_name, c.accuracy, c.precision, c.recall, c.f1_score, auc
        ));

        report.push_str(&format!("## {}\n\n", results.model_name));
        report.push_str(&format!("*{}*\n\n", results.model_description));
        report.push_str("### Performance Metrics\n\n");
        report.push_str(&format!("```\n{}\n```\n\n", results.metrics.format()));

        if let Some(roc) = &results.metrics.roc_curve {
            report.push_str("### ROC Curve\n\n");
            report.push_str("| Threshold | FPR | TPR |\n");
            report.push_str("|-----------|-----|-----|\n");
            for point in &roc.points {
                let threshold = point.threshold.map_or("-".to_string(), |t| format!("{:.4}", t));
                report.push_str(&format!(
                    "| {} | {:.4} | {:.4} |\n",
                    threshold, point.fpr, point.tpr
                ));
            }
            report.push('\n');
        }

        if !results.spam_tokens.is_empty() {
            report.push_str("### Indicative Tokens\n\n");
            report.push_str(&format!("- **Spam:** {}\n", join_tokens(&results.spam_tokens)));
            report.push_str(&format!("- **Not Spam:** {}\n\n", join_tokens(&results.ham_tokens)));
        }

        let errors: Vec<_> = results.predictions_sample.iter().filter(|p| !p.correct).collect();
        if !errors.is_empty() {
            report.push_str("### Sample Errors\n\n");
            for p in errors.iter().take(5) {
                report.push_str(&format!(
                    "- `{}` predicted {} (P(spam)={:.2}), actual {}: {}\n",
                    p.id, p.predicted, p.probability, p.actual, p.text_preview
                ));
            }
            report.push('\n');
        }

        report.push_str("## Configuration\n\n");
        report.push_str(&format!("```json\n{}\n```\n", serde_json::to_string_pretty(&results.config).unwrap_or_default()));

        report
    }
}

fn bodies(samples: &[Sample]) -> Vec<String> {
    samples.iter().map(|s| s.body.clone()).collect()
}

fn join_tokens(tokens: &[(String, f64)]) -> String {
    tokens
        .iter()
        .map(|(token, _)| token.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// First 10 correct and first 10 wrong predictions
fn sample_predictions<'a>(
    predictions: impl Iterator<Item = (&'a Sample, Label, f64)>,
) -> Vec<PredictionSample> {
    let mut samples = Vec::new();
    let mut errors = 0;
    let mut corrects = 0;

    for (sample, predicted, probability) in predictions {
        let correct = predicted == sample.label;
        if (!correct && errors < 10) || (correct && corrects < 10) {
            let mut text_preview: String = sample.body.chars().take(100).collect();
            if sample.body.chars().count() > 100 {
                text_preview.push_str("...");
            }
            samples.push(PredictionSample {
                id: sample.id.clone(),
                text_preview,
                predicted: predicted.display_name().to_string(),
                actual: sample.label.display_name().to_string(),
                probability,
                correct,
            });
            if correct {
                corrects += 1;
            } else {
                errors += 1;
            }
        }
        if errors >= 10 && corrects >= 10 {
            break;
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::{synthetic_table, BODY_COLUMN, LABEL_COLUMN};
    use crate::error::SpamEvalError;

    fn small_table(rows: &[(&str, &str)]) -> RawTable {
        RawTable::new(
            "small",
            vec![BODY_COLUMN.to_string(), LABEL_COLUMN.to_string()],
            rows.iter()
                .map(|(body, label)| vec![Some(body.to_string()), Some(label.to_string())])
                .collect(),
        )
    }

    #[test]
    fn test_pipeline_synthetic() {
        let pipeline = EvaluationPipeline::new(EvaluationConfig::default());
        let results = pipeline.run().expect("Pipeline should succeed");

        assert_eq!(results.dataset_info.total_samples, 1000);
        assert_eq!(results.dataset_info.test_samples, 200);
        assert_eq!(results.dataset_info.train_samples, 800);
        assert_eq!(results.model_name, "Naive Bayes");
        assert!(results.metrics.classification.accuracy >= 0.9);
        assert!(results.metrics.roc_curve.is_some());
        assert!(!results.spam_tokens.is_empty());
        assert!(results.predictions_sample.len() <= 20);
    }

    #[test]
    fn test_pipeline_is_reproducible() {
        let config = EvaluationConfig {
            seed: 7,
            ..EvaluationConfig::default()
        };
        let a = EvaluationPipeline::new(config.clone()).run().unwrap();
        let b = EvaluationPipeline::new(config).run().unwrap();

        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.dataset_info, b.dataset_info);
        assert_eq!(a.predictions_sample, b.predictions_sample);
    }

    #[test]
    fn test_validation_happens_before_loading() {
        // The dataset directory does not exist; validation must fail first
        let base = EvaluationConfig {
            dataset: DatasetId::SpamAssassin,
            dataset_dir: "/nonexistent/spam-data".to_string(),
            ..EvaluationConfig::default()
        };

        let bad_step = EvaluationConfig {
            steps: vec!["to_lower".to_string(), "stem".to_string()],
            ..base.clone()
        };
        assert!(matches!(
            EvaluationPipeline::new(bad_step).run(),
            Err(SpamEvalError::UnknownStep { .. })
        ));

        let bad_algorithm = EvaluationConfig {
            algorithm: Algorithm::Svm,
            ..base.clone()
        };
        assert!(matches!(
            EvaluationPipeline::new(bad_algorithm).run(),
            Err(SpamEvalError::UnsupportedAlgorithm(_))
        ));

        let bad_fraction = EvaluationConfig {
            test_fraction: 1.0,
            ..base.clone()
        };
        assert!(matches!(
            EvaluationPipeline::new(bad_fraction).run(),
            Err(SpamEvalError::InvalidSplit(_))
        ));

        assert!(matches!(
            EvaluationPipeline::new(base).run(),
            Err(SpamEvalError::Io(_))
        ));
    }

    #[test]
    fn test_run_on_table_with_identity_pipeline() {
        let config = EvaluationConfig {
            steps: vec![],
            test_fraction: 0.25,
            ..EvaluationConfig::default()
        };
        let results = EvaluationPipeline::new(config)
            .run_on_table(&synthetic_table(40, 3))
            .unwrap();

        assert_eq!(results.dataset_info.preprocessing, "identity");
        assert_eq!(results.dataset_info.test_samples, 10);
    }

    #[test]
    fn test_single_class_training_is_rejected() {
        let table = small_table(&[("a b", "ham"), ("c d", "ham"), ("e f", "ham"), ("g h", "0")]);
        let result = EvaluationPipeline::new(EvaluationConfig::default()).run_on_table(&table);
        assert!(matches!(result, Err(SpamEvalError::EmptyTrainingSet(_))));
    }

    #[test]
    fn test_dropped_rows_are_reported() {
        let mut table = synthetic_table(30, 1);
        table.rows.push(vec![None, Some("1".to_string())]);
        table.rows.push(vec![Some("odd".to_string()), Some("unknown".to_string())]);

        let results = EvaluationPipeline::new(EvaluationConfig::default())
            .run_on_table(&table)
            .unwrap();
        assert_eq!(results.dataset_info.dropped_rows, 2);
        assert_eq!(results.dataset_info.total_samples, 30);
    }

    #[test]
    fn test_config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(
            &path,
            r#"{"dataset": "enron-spam", "steps": ["to_lower"], "seed": 9}"#,
        )
        .unwrap();

        let config = EvaluationConfig::from_json_file(&path).unwrap();
        assert_eq!(config.dataset, DatasetId::EnronSpam);
        assert_eq!(config.steps, vec!["to_lower".to_string()]);
        assert_eq!(config.seed, 9);
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!(config.algorithm, Algorithm::NaiveBayes);
    }

    #[test]
    fn test_save_results_and_report() {
        let results = EvaluationPipeline::new(EvaluationConfig::default()).run().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");
        EvaluationPipeline::save_results(&results, &path).unwrap();
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["model_name"], "Naive Bayes");

        let loaded: EvaluationResults =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.config, results.config);
        assert_eq!(loaded.dataset_info, results.dataset_info);
        assert_eq!(loaded.model_name, results.model_name);
        assert_eq!(loaded.timestamp, results.timestamp);
        assert_eq!(
            loaded.metrics.classification.confusion_matrix,
            results.metrics.classification.confusion_matrix
        );
        let (saved_roc, roc) = (
            loaded.metrics.roc_curve.as_ref().unwrap(),
            results.metrics.roc_curve.as_ref().unwrap(),
        );
        assert_eq!(saved_roc.points.len(), roc.points.len());
        assert_eq!(saved_roc.points[0].threshold, None);
        assert!((saved_roc.auc - roc.auc).abs() < 1e-12);
        assert_eq!(loaded.predictions_sample.len(), results.predictions_sample.len());

        let report = EvaluationPipeline::generate_report(&results);
        assert!(report.contains("Spam Classifier Evaluation Report"));
        assert!(report.contains("ROC Curve"));
        assert!(report.contains("remove_hyperlink -> replace_newline"));
    }
}
