// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Composition of cleaning steps into a per-record preprocessing pipeline

use crate::cleaning::CleaningStep;
use crate::datasets::{Dataset, Sample};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Ordered sequence of cleaning steps applied left to right
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    steps: Vec<CleaningStep>,
}

impl Pipeline {
    /// Resolve every name before anything is processed.
    ///
    /// An empty list yields the identity pipeline.
    pub fn compose<S: AsRef<str>>(step_names: &[S]) -> Result<Self> {
        let steps = step_names
            .iter()
            .map(|name| CleaningStep::lookup(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps })
    }

    pub fn from_steps(steps: Vec<CleaningStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[CleaningStep] {
        &self.steps
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    /// `step_n(...step_2(step_1(text)))`
    pub fn apply(&self, text: &str) -> String {
        self.steps
            .iter()
            .fold(text.to_string(), |acc, step| step.apply(&acc))
    }

    pub fn apply_all<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        texts.iter().map(|t| self.apply(t.as_ref())).collect()
    }

    /// Preprocess every body into a new dataset; `dataset` keeps its originals
    pub fn apply_dataset(&self, dataset: &Dataset) -> Dataset {
        let samples = dataset
            .samples()
            .iter()
            .map(|s| Sample {
                id: s.id.clone(),
                body: self.apply(&s.body),
                label: s.label,
            })
            .collect();
        Dataset::new(dataset.source(), samples)
    }

    /// Human-readable step chain, e.g. `to_lower -> remove_whitespace`
    pub fn describe(&self) -> String {
        if self.steps.is_empty() {
            return "identity".to_string();
        }
        self.steps
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets::Label;
    use crate::error::SpamEvalError;
    use proptest::prelude::*;

    #[test]
    fn test_buy_now_scenario() {
        let pipeline = Pipeline::compose(&[
            "remove_hyperlink",
            "to_lower",
            "remove_number",
            "remove_punctuation",
            "remove_whitespace",
        ])
        .unwrap();

        let out = pipeline.apply_all(&["Buy NOW!!! http://x.com 123"]);
        assert_eq!(out, vec!["buy now".to_string()]);
    }

    #[test]
    fn test_unknown_step_fails_before_processing() {
        let err = Pipeline::compose(&["to_lower", "lemmatize", "remove_whitespace"]).unwrap_err();
        assert!(matches!(err, SpamEvalError::UnknownStep { ref name, .. } if name == "lemmatize"));
    }

    #[test]
    fn test_order_is_preserved() {
        // Punctuation removal first destroys the URL marker
        let link_first = Pipeline::compose(&["remove_hyperlink", "remove_punctuation"]).unwrap();
        let punct_first = Pipeline::compose(&["remove_punctuation", "remove_hyperlink"]).unwrap();

        assert_eq!(link_first.apply("go http://a.io/x"), "go ");
        assert_eq!(punct_first.apply("go http://a.io/x"), "go httpaiox");
        assert_eq!(link_first.describe(), "remove_hyperlink -> remove_punctuation");
        assert_eq!(
            link_first.steps(),
            &[CleaningStep::RemoveHyperlink, CleaningStep::RemovePunctuation]
        );
    }

    #[test]
    fn test_apply_handles_edge_inputs() {
        let pipeline = Pipeline::from_steps(CleaningStep::all().to_vec());
        assert_eq!(pipeline.apply(""), "");
        assert_eq!(pipeline.apply(" \t\r\n "), "");
        assert_eq!(pipeline.apply("Привет, МИР 2024! 👋"), "привет мир 👋");
    }

    #[test]
    fn test_apply_dataset_keeps_original() {
        let raw = Dataset::new(
            "unit",
            vec![Sample {
                id: "unit_0".to_string(),
                body: "FREE Money!!".to_string(),
                label: Label::Spam,
            }],
        );
        let pipeline = Pipeline::compose(&["to_lower", "remove_punctuation"]).unwrap();
        let cleaned = pipeline.apply_dataset(&raw);

        assert_eq!(cleaned.samples()[0].body, "free money");
        assert_eq!(raw.samples()[0].body, "FREE Money!!");
        assert_eq!(cleaned.samples()[0].id, "unit_0");
        assert_eq!(cleaned.source(), "unit");
    }

    proptest! {
        #[test]
        fn prop_empty_pipeline_is_identity(text in any::<String>()) {
            let names: [&str; 0] = [];
            let pipeline = Pipeline::compose(&names).unwrap();
            prop_assert!(pipeline.is_identity());
            prop_assert_eq!(pipeline.apply(&text), text);
        }
    }
}
