// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Dataset exploration CLI
//!
//! Usage:
//!   explore-dataset --dataset synthetic
//!   explore-dataset --dataset enron --dataset ling --data-dir ./data --top 15

use anyhow::{Context, Result};
use clap::Parser;
use spam_eval::datasets::{Dataset, DatasetCleaner, DatasetId};
use spam_eval::exploration::{sample, ProfileComparison};
use spam_eval::preprocess::Pipeline;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "explore-dataset")]
#[command(about = "Profile email datasets before and after preprocessing")]
#[command(version)]
struct Args {
    /// Dataset to explore; repeat to concatenate several
    #[arg(short, long, default_value = "synthetic")]
    dataset: Vec<DatasetId>,

    /// Directory holding the dataset CSV files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Cleaning steps in order (comma-separated)
    #[arg(long, default_value = "remove_hyperlink,replace_newline,to_lower,remove_number,remove_punctuation,remove_whitespace")]
    steps: String,

    /// Number of random emails to show
    #[arg(long, default_value_t = 5)]
    samples: usize,

    /// Number of frequent words listed per class
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Random seed for sampling and generated data
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let step_names: Vec<&str> = args
        .steps
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let preprocess = Pipeline::compose(&step_names).context("Invalid cleaning steps")?;

    let cleaner = DatasetCleaner::new();
    let mut datasets = Vec::with_capacity(args.dataset.len());
    for id in &args.dataset {
        let table = id
            .load(&args.data_dir, args.seed)
            .with_context(|| format!("Failed to load {}", id))?;
        datasets.push(cleaner.clean(&table)?);
    }
    let raw = if datasets.len() == 1 {
        datasets.remove(0)
    } else {
        Dataset::concat(&datasets)
    };
    let preprocessed = preprocess.apply_dataset(&raw);

    println!("{}", ProfileComparison::between(&raw, &preprocessed, args.top).format());

    println!("Random samples (preprocessing: {}):", preprocess.describe());
    println!("{:-<70}", "");
    let picked = sample(&raw, args.samples, args.seed);
    for email in &picked {
        let preview: String = email.body.chars().take(120).collect();
        let cleaned: String = preprocess.apply(&email.body).chars().take(120).collect();
        println!("[{}] {}", email.label.display_name(), email.id);
        println!("  raw:     {}", preview.replace(['\n', '\r'], " "));
        println!("  cleaned: {}", cleaned);
    }
    println!("{:-<70}", "");

    Ok(())
}
