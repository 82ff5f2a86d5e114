// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Spam classifier evaluation CLI
//!
//! Usage:
//!   spam-eval --dataset synthetic --seed 42
//!   spam-eval --dataset enron --data-dir ./data --steps to_lower,remove_whitespace
//!   spam-eval --config run.json --format markdown

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use spam_eval::classifiers::Algorithm;
use spam_eval::cleaning::CleaningStep;
use spam_eval::datasets::DatasetId;
use spam_eval::pipeline::{EvaluationConfig, EvaluationPipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
    Both,
}

#[derive(Parser, Debug)]
#[command(name = "spam-eval")]
#[command(about = "Train and evaluate a spam classifier on an email dataset")]
#[command(version)]
struct Args {
    /// Dataset (spam-assassin, enron-spam, ling-spam, synthetic)
    #[arg(short, long)]
    dataset: Option<DatasetId>,

    /// Directory holding the dataset CSV files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Learning algorithm (naive-bayes, svm, random-forest)
    #[arg(short, long)]
    algorithm: Option<Algorithm>,

    /// Cleaning steps in order (comma-separated)
    #[arg(long)]
    steps: Option<String>,

    /// Share of samples held out for testing
    #[arg(short, long)]
    test_fraction: Option<f64>,

    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "both")]
    format: OutputFormat,

    /// JSON run configuration; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List the available cleaning steps, datasets and algorithms and exit
    #[arg(long)]
    list_steps: bool,
}

fn list_steps() {
    println!("Available cleaning steps:");
    for step in CleaningStep::all() {
        println!("  {:<20} {}", step.name(), step.description());
    }

    println!("\nDatasets:");
    for dataset in DatasetId::all() {
        let source = dataset.file_name().unwrap_or("generated in memory");
        println!("  {:<20} {}", dataset.display_name(), source);
    }

    println!("\nAlgorithms:");
    for algorithm in Algorithm::all() {
        let status = if algorithm.is_implemented() { "" } else { " (not implemented)" };
        println!("  {}{}", algorithm.display_name(), status);
    }
}

fn build_config(args: &Args) -> Result<EvaluationConfig> {
    let mut config = match &args.config {
        Some(path) => EvaluationConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => EvaluationConfig::default(),
    };

    if let Some(dataset) = args.dataset {
        config.dataset = dataset;
    }
    if let Some(dir) = &args.data_dir {
        config.dataset_dir = dir.to_string_lossy().to_string();
    }
    if let Some(algorithm) = args.algorithm {
        config.algorithm = algorithm;
    }
    if let Some(steps) = &args.steps {
        config.steps = steps
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(fraction) = args.test_fraction {
        config.test_fraction = fraction;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(output) = &args.output {
        config.output_dir = output.to_string_lossy().to_string();
    }

    if config.steps.is_empty() {
        bail!("Select at least one cleaning step (see --list-steps)");
    }

    Ok(config)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.list_steps {
        list_steps();
        return Ok(());
    }

    let config = build_config(&args)?;

    tracing::info!("Spam Classifier Evaluation");
    tracing::info!("==========================");
    tracing::info!("Dataset: {}", config.dataset);
    tracing::info!("Algorithm: {}", config.algorithm);
    tracing::info!("Steps: {}", config.steps.join(", "));
    tracing::info!("Seed: {}", config.seed);

    let pipeline = EvaluationPipeline::new(config.clone());
    let results = pipeline
        .run()
        .with_context(|| format!("Evaluation on {} failed", config.dataset))?;

    let pct = results.metrics.percentages();
    let info = &results.dataset_info;

    // Print summary to console
    println!("\n{}", "=".repeat(70));
    println!("EVALUATION SUMMARY");
    println!("{}", "=".repeat(70));
    println!(
        "\nDataset: {} ({} samples, {} dropped; train={}, test={})",
        info.name, info.total_samples, info.dropped_rows, info.train_samples, info.test_samples
    );
    println!("Preprocessing: {}", info.preprocessing);
    println!("Model: {}", results.model_name);
    println!("{:-<70}", "");
    println!("{:<12} {:>10} {:>10} {:>10} {:>10} {:>10}", "", "Accuracy", "Precision", "Recall", "F1", "AUC-ROC");
    println!("{:-<70}", "");
    let auc = results.metrics.auc().map_or("-".to_string(), |v| format!("{:.4}", v));
    println!(
        "{:<12} {:>9.2}% {:>9.2}% {:>9.2}% {:>9.2}% {:>10}",
        "Test", pct.accuracy, pct.precision, pct.recall, pct.f1_score, auc
    );
    println!("{:-<70}", "");

    let [[tn, fp], [fn_, tp]] = results.metrics.classification.confusion_matrix.as_table();
    println!("\nConfusion Matrix (rows = actual, columns = predicted):");
    println!("{:<12} {:>10} {:>10}", "", "Not Spam", "Spam");
    println!("{:<12} {:>10} {:>10}", "Not Spam", tn, fp);
    println!("{:<12} {:>10} {:>10}", "Spam", fn_, tp);

    // Save outputs
    let output_dir = PathBuf::from(&config.output_dir);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let stem = config.dataset.display_name().to_lowercase().replace(' ', "_");

    if matches!(args.format, OutputFormat::Json | OutputFormat::Both) {
        let json_path = output_dir.join(format!("eval_{}_{}.json", stem, timestamp));
        EvaluationPipeline::save_results(&results, &json_path)?;
        println!("\nJSON results saved to: {}", json_path.display());
    }

    if matches!(args.format, OutputFormat::Markdown | OutputFormat::Both) {
        let report = EvaluationPipeline::generate_report(&results);
        let md_path = output_dir.join(format!("eval_{}_{}.md", stem, timestamp));
        std::fs::write(&md_path, report)?;
        println!("Markdown report saved to: {}", md_path.display());
    }

    println!("\nEvaluation complete!");

    Ok(())
}
