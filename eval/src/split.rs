// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Seeded train/test partitioning and label encoding
//!
//! The split is not stratified: class proportions in each subset follow
//! whatever the shuffle produces. Small or heavily imbalanced datasets can
//! end up with a test set missing one class.

use crate::datasets::{Dataset, Label, Sample};
use crate::error::{Result, SpamEvalError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Disjoint train and test subsets of one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<Sample>,
    pub test: Vec<Sample>,
}

impl Split {
    pub fn total(&self) -> usize {
        self.train.len() + self.test.len()
    }
}

/// The test fraction must be finite and strictly between 0 and 1
pub fn check_test_fraction(test_fraction: f64) -> Result<()> {
    if !test_fraction.is_finite() || test_fraction <= 0.0 || test_fraction >= 1.0 {
        return Err(SpamEvalError::InvalidSplit(test_fraction));
    }
    Ok(())
}

/// Shuffle with a seeded RNG and cut off `ceil(test_fraction * n)` test samples
pub fn train_test_split(dataset: &Dataset, test_fraction: f64, seed: u64) -> Result<Split> {
    check_test_fraction(test_fraction)?;

    let n = dataset.len();
    let n_test = (test_fraction * n as f64).ceil() as usize;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let samples = dataset.samples();
    let (test_idx, train_idx) = indices.split_at(n_test.min(n));

    let split = Split {
        train: train_idx.iter().map(|&i| samples[i].clone()).collect(),
        test: test_idx.iter().map(|&i| samples[i].clone()).collect(),
    };

    tracing::info!(
        "Split {} samples (seed={}, test_fraction={}): train={}, test={}",
        n,
        seed,
        test_fraction,
        split.train.len(),
        split.test.len()
    );

    Ok(split)
}

/// Maps label values to class indices, fit on the training split only.
///
/// The direction is fixed by name (ham = 0, spam = 1) rather than by the
/// order labels are encountered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: BTreeSet<Label>,
}

impl LabelEncoder {
    pub fn fit(labels: &[Label]) -> Self {
        Self {
            classes: labels.iter().copied().collect(),
        }
    }

    /// Labels seen during fit, ordered by class index
    pub fn classes(&self) -> Vec<Label> {
        self.classes.iter().copied().collect()
    }

    pub fn transform(&self, labels: &[Label]) -> Result<Vec<u8>> {
        labels
            .iter()
            .map(|label| {
                if self.classes.contains(label) {
                    Ok(label.to_binary())
                } else {
                    Err(SpamEvalError::UnseenLabel(label.to_string()))
                }
            })
            .collect()
    }

    pub fn inverse_transform(&self, encoded: &[u8]) -> Result<Vec<Label>> {
        encoded
            .iter()
            .map(|&value| {
                if value > 1 {
                    return Err(SpamEvalError::InvalidEncodedLabel(value));
                }
                let label = Label::from_binary(value);
                if self.classes.contains(&label) {
                    Ok(label)
                } else {
                    Err(SpamEvalError::UnseenLabel(label.to_string()))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn dataset(n: usize) -> Dataset {
        let samples = (0..n)
            .map(|i| Sample {
                id: format!("s_{}", i),
                body: format!("email number {}", i),
                label: if i % 3 == 0 { Label::Spam } else { Label::Ham },
            })
            .collect();
        Dataset::new("unit", samples)
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let data = dataset(101);
        let split = train_test_split(&data, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 21);
        assert_eq!(split.train.len(), 80);
        assert_eq!(split.total(), data.len());

        let train_ids: HashSet<_> = split.train.iter().map(|s| s.id.clone()).collect();
        let test_ids: HashSet<_> = split.test.iter().map(|s| s.id.clone()).collect();
        assert!(train_ids.is_disjoint(&test_ids));

        let all: HashSet<_> = train_ids.union(&test_ids).cloned().collect();
        let expected: HashSet<_> = data.samples().iter().map(|s| s.id.clone()).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_split_is_reproducible() {
        let data = dataset(50);
        let a = train_test_split(&data, 0.3, 7).unwrap();
        let b = train_test_split(&data, 0.3, 7).unwrap();
        let c = train_test_split(&data, 0.3, 8).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let data = dataset(10);
        for fraction in [0.0, 1.0, -0.1, 1.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                train_test_split(&data, fraction, 1),
                Err(SpamEvalError::InvalidSplit(_))
            ));
        }
    }

    #[test]
    fn test_split_empty_dataset() {
        let split = train_test_split(&dataset(0), 0.2, 1).unwrap();
        assert_eq!(split.total(), 0);
    }

    #[test]
    fn test_label_encoder_fixed_direction() {
        // Spam encountered first still maps to 1
        let encoder = LabelEncoder::fit(&[Label::Spam, Label::Ham, Label::Spam]);
        assert_eq!(encoder.classes(), vec![Label::Ham, Label::Spam]);
        assert_eq!(
            encoder.transform(&[Label::Ham, Label::Spam]).unwrap(),
            vec![0, 1]
        );
        assert_eq!(
            encoder.inverse_transform(&[1, 0]).unwrap(),
            vec![Label::Spam, Label::Ham]
        );
        assert!(matches!(
            encoder.inverse_transform(&[2]),
            Err(SpamEvalError::InvalidEncodedLabel(2))
        ));
    }

    #[test]
    fn test_label_encoder_unseen_label() {
        let encoder = LabelEncoder::fit(&[Label::Ham, Label::Ham]);
        let err = encoder.transform(&[Label::Ham, Label::Spam]).unwrap_err();
        assert!(matches!(err, SpamEvalError::UnseenLabel(ref l) if l == "spam"));
    }
}
