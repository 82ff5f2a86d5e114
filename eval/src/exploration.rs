// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Dataset exploration: label balance, length statistics and word frequencies
//!
//! Profiles are plain data. Rendering (charts, word clouds) is left to the
//! caller; `format()` gives a console view.

use crate::datasets::{Dataset, Label, Sample};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Min / max / mean of a per-email count
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LengthStats {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

impl LengthStats {
    fn from_counts(counts: impl Iterator<Item = usize>) -> Self {
        let mut stats = LengthStats {
            min: usize::MAX,
            ..Default::default()
        };
        let mut total = 0usize;
        let mut n = 0usize;
        for count in counts {
            stats.min = stats.min.min(count);
            stats.max = stats.max.max(count);
            total += count;
            n += 1;
        }
        if n == 0 {
            return LengthStats::default();
        }
        stats.mean = total as f64 / n as f64;
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStats {
    pub emails: usize,
    pub chars: LengthStats,
    pub words: LengthStats,
}

impl TextStats {
    fn from_samples<'a>(samples: impl Iterator<Item = &'a Sample> + Clone) -> Self {
        Self {
            emails: samples.clone().count(),
            chars: LengthStats::from_counts(samples.clone().map(|s| s.body.chars().count())),
            words: LengthStats::from_counts(samples.map(|s| s.body.split_whitespace().count())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelShare {
    pub count: usize,
    pub percentage: f64,
}

/// Summary of one dataset, keyed by label display name where per-class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub source: String,
    pub total: usize,
    pub labels: BTreeMap<String, LabelShare>,
    pub overall: TextStats,
    pub per_class: BTreeMap<String, TextStats>,
    /// Most frequent lowercased whitespace tokens per class, descending
    pub top_words: BTreeMap<String, Vec<(String, usize)>>,
}

impl DatasetProfile {
    pub fn build(dataset: &Dataset, top_n: usize) -> Self {
        let samples = dataset.samples();
        let total = samples.len();
        let distribution = Dataset::label_distribution(samples);

        let mut labels = BTreeMap::new();
        let mut per_class = BTreeMap::new();
        let mut top_words = BTreeMap::new();

        for label in [Label::Ham, Label::Spam] {
            let count = distribution.get(&label).copied().unwrap_or(0);
            let percentage = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            };
            let name = label.display_name().to_string();
            let class_samples = samples.iter().filter(move |s| s.label == label);

            labels.insert(name.clone(), LabelShare { count, percentage });
            per_class.insert(name.clone(), TextStats::from_samples(class_samples.clone()));
            top_words.insert(name, word_frequencies(class_samples, top_n));
        }

        Self {
            source: dataset.source().to_string(),
            total,
            labels,
            overall: TextStats::from_samples(samples.iter()),
            per_class,
            top_words,
        }
    }

    pub fn format(&self) -> String {
        let mut out = format!("Dataset: {} ({} emails)\n", self.source, self.total);

        out.push_str("\nLabel distribution:\n");
        for (label, share) in &self.labels {
            out.push_str(&format!(
                "  {:<10} {:>7} ({:.2}%)\n",
                label, share.count, share.percentage
            ));
        }

        out.push_str("\nLength statistics (min / max / mean):\n");
        out.push_str(&format_stats("All", &self.overall));
        for (label, stats) in &self.per_class {
            out.push_str(&format_stats(label, stats));
        }

        out.push_str("\nMost frequent words:\n");
        for (label, words) in &self.top_words {
            let listed: Vec<String> = words
                .iter()
                .map(|(word, count)| format!("{} ({})", word, count))
                .collect();
            out.push_str(&format!("  {}: {}\n", label, listed.join(", ")));
        }

        out
    }
}

fn format_stats(label: &str, stats: &TextStats) -> String {
    format!(
        "  {:<10} chars {} / {} / {:.1}   words {} / {} / {:.1}\n",
        label,
        stats.chars.min,
        stats.chars.max,
        stats.chars.mean,
        stats.words.min,
        stats.words.max,
        stats.words.mean
    )
}

fn word_frequencies<'a>(samples: impl Iterator<Item = &'a Sample>, top_n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for sample in samples {
        for word in sample.body.split_whitespace() {
            *counts.entry(word.to_lowercase()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    ranked
}

/// Up to `n` distinct emails picked with a seeded RNG
pub fn sample(dataset: &Dataset, n: usize, seed: u64) -> Vec<Sample> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    dataset
        .samples()
        .choose_multiple(&mut rng, n.min(dataset.len()))
        .cloned()
        .collect()
}

/// Raw and preprocessed profiles of the same dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileComparison {
    pub raw: DatasetProfile,
    pub preprocessed: DatasetProfile,
}

impl ProfileComparison {
    pub fn between(raw: &Dataset, preprocessed: &Dataset, top_n: usize) -> Self {
        Self {
            raw: DatasetProfile::build(raw, top_n),
            preprocessed: DatasetProfile::build(preprocessed, top_n),
        }
    }

    pub fn format(&self) -> String {
        format!(
            "=== Raw ===\n{}\n=== Preprocessed ===\n{}",
            self.raw.format(),
            self.preprocessed.format()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::Pipeline;

    fn dataset() -> Dataset {
        let rows = [
            ("Free money NOW", Label::Spam),
            ("free prize", Label::Spam),
            ("Lunch at noon?", Label::Ham),
            ("see you at lunch", Label::Ham),
            ("ok", Label::Ham),
        ];
        let samples = rows
            .iter()
            .enumerate()
            .map(|(i, (body, label))| Sample {
                id: format!("e_{}", i),
                body: body.to_string(),
                label: *label,
            })
            .collect();
        Dataset::new("unit", samples)
    }

    #[test]
    fn test_profile_label_shares() {
        let profile = DatasetProfile::build(&dataset(), 3);

        assert_eq!(profile.total, 5);
        assert_eq!(profile.labels["Spam"].count, 2);
        assert_eq!(profile.labels["Not Spam"].count, 3);
        assert!((profile.labels["Spam"].percentage - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_profile_length_stats() {
        let profile = DatasetProfile::build(&dataset(), 3);

        assert_eq!(profile.overall.words.min, 1);
        assert_eq!(profile.overall.words.max, 4);
        assert_eq!(profile.overall.chars.min, 2);
        assert_eq!(profile.per_class["Spam"].emails, 2);
        assert!((profile.per_class["Spam"].words.mean - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_top_words_lowercased_and_ranked() {
        let profile = DatasetProfile::build(&dataset(), 2);

        assert_eq!(
            profile.top_words["Spam"],
            vec![("free".to_string(), 2), ("money".to_string(), 1)]
        );
        assert_eq!(profile.top_words["Not Spam"][0], ("at".to_string(), 2));
    }

    #[test]
    fn test_empty_dataset_profile() {
        let profile = DatasetProfile::build(&Dataset::new("empty", vec![]), 5);
        assert_eq!(profile.total, 0);
        assert_eq!(profile.overall.chars, LengthStats::default());
        assert_eq!(profile.labels["Spam"].percentage, 0.0);
    }

    #[test]
    fn test_sample_is_seeded_and_capped() {
        let data = dataset();
        assert_eq!(sample(&data, 2, 9), sample(&data, 2, 9));
        assert_eq!(sample(&data, 50, 9).len(), 5);
        assert!(sample(&data, 0, 9).is_empty());
    }

    #[test]
    fn test_comparison_shows_preprocessing_effect() {
        let raw = dataset();
        let cleaned = Pipeline::compose(&["to_lower", "remove_punctuation"])
            .unwrap()
            .apply_dataset(&raw);
        let comparison = ProfileComparison::between(&raw, &cleaned, 10);

        let raw_words: Vec<_> = comparison.raw.top_words["Not Spam"].iter().map(|(w, _)| w.clone()).collect();
        let clean_words: Vec<_> = comparison.preprocessed.top_words["Not Spam"].iter().map(|(w, _)| w.clone()).collect();
        assert!(raw_words.contains(&"noon?".to_string()));
        assert!(clean_words.contains(&"noon".to_string()));

        let text = comparison.format();
        assert!(text.contains("=== Raw ==="));
        assert!(text.contains("Label distribution"));
    }
}
