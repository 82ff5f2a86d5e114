// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Bag-of-words count vectorization

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tokens of two or more word characters
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Sparse count vector: `(feature index, count)` sorted by index
pub type SparseCounts = Vec<(usize, u32)>;

/// Vocabulary-based token counter
///
/// The vocabulary is fit once and then frozen. Tokens outside it are
/// ignored when transforming.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountVectorizer {
    /// Token -> feature index, indices assigned in sorted token order
    vocabulary: BTreeMap<String, usize>,
}

impl CountVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowercased word tokens
    pub fn tokenize(text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        TOKEN_RE
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Build the vocabulary from training texts only
    pub fn fit<S: AsRef<str>>(&mut self, texts: &[S]) {
        let tokens: BTreeSet<String> = texts
            .iter()
            .flat_map(|t| Self::tokenize(t.as_ref()))
            .collect();

        self.vocabulary = tokens
            .into_iter()
            .enumerate()
            .map(|(idx, token)| (token, idx))
            .collect();

        tracing::debug!("Vocabulary fit on {} texts: {} features", texts.len(), self.vocabulary.len());
    }

    pub fn transform_one(&self, text: &str) -> SparseCounts {
        let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
        for token in Self::tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0) += 1;
            }
        }
        counts.into_iter().collect()
    }

    pub fn transform<S: AsRef<str>>(&self, texts: &[S]) -> Vec<SparseCounts> {
        texts.iter().map(|t| self.transform_one(t.as_ref())).collect()
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, texts: &[S]) -> Vec<SparseCounts> {
        self.fit(texts);
        self.transform(texts)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn vocabulary(&self) -> &BTreeMap<String, usize> {
        &self.vocabulary
    }

    /// Token for a feature index
    pub fn feature_name(&self, idx: usize) -> Option<&str> {
        self.vocabulary
            .iter()
            .find(|(_, &i)| i == idx)
            .map(|(token, _)| token.as_str())
    }
}
