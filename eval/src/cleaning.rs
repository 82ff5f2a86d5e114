// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Registry of text cleaning steps applied to email bodies
//!
//! Every step is a pure, total `&str -> String` transform. Steps are a closed
//! set resolved by their stable snake_case identifier.
//!
//! Ordering notes:
//! - `to_lower`, `remove_number` and `remove_punctuation` commute with each
//!   other, and `replace_newline` commutes with all three.
//! - `remove_hyperlink` must run before `remove_punctuation` (the `://` marker
//!   is punctuation) and its result depends on where `replace_newline` runs,
//!   since a newline ends a URL.
//! - `remove_whitespace` normally runs last: deleting characters can open new
//!   whitespace runs.

use crate::error::{Result, SpamEvalError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `scheme://` followed by everything up to the next whitespace.
/// The scheme is alphanumeric so text glued on with punctuation survives.
static HYPERLINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9]*://\S+").unwrap());

/// A named cleaning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStep {
    RemoveHyperlink,
    ReplaceNewline,
    ToLower,
    RemoveNumber,
    RemovePunctuation,
    RemoveWhitespace,
}

impl CleaningStep {
    /// All registered steps in catalog order
    pub fn all() -> &'static [CleaningStep] {
        &[
            CleaningStep::RemoveHyperlink,
            CleaningStep::ReplaceNewline,
            CleaningStep::ToLower,
            CleaningStep::RemoveNumber,
            CleaningStep::RemovePunctuation,
            CleaningStep::RemoveWhitespace,
        ]
    }

    /// Resolve a step by its identifier
    pub fn lookup(name: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|step| step.name() == name)
            .ok_or_else(|| SpamEvalError::UnknownStep {
                name: name.to_string(),
                available: Self::all()
                    .iter()
                    .map(|s| s.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Stable identifier
    pub fn name(&self) -> &'static str {
        match self {
            CleaningStep::RemoveHyperlink => "remove_hyperlink",
            CleaningStep::ReplaceNewline => "replace_newline",
            CleaningStep::ToLower => "to_lower",
            CleaningStep::RemoveNumber => "remove_number",
            CleaningStep::RemovePunctuation => "remove_punctuation",
            CleaningStep::RemoveWhitespace => "remove_whitespace",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CleaningStep::RemoveHyperlink => "Delete scheme://host/path links",
            CleaningStep::ReplaceNewline => "Turn every newline or carriage return into a space",
            CleaningStep::ToLower => "Lowercase all alphabetic characters",
            CleaningStep::RemoveNumber => "Delete decimal digits 0-9",
            CleaningStep::RemovePunctuation => "Delete ASCII punctuation",
            CleaningStep::RemoveWhitespace => "Collapse whitespace runs and trim both ends",
        }
    }

    /// Run the step on one text
    pub fn apply(&self, text: &str) -> String {
        match self {
            CleaningStep::RemoveHyperlink => HYPERLINK_RE.replace_all(text, "").into_owned(),
            CleaningStep::ReplaceNewline => text
                .chars()
                .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
                .collect(),
            CleaningStep::ToLower => text.to_lowercase(),
            CleaningStep::RemoveNumber => text.chars().filter(|c| !c.is_ascii_digit()).collect(),
            CleaningStep::RemovePunctuation => {
                text.chars().filter(|c| !c.is_ascii_punctuation()).collect()
            }
            CleaningStep::RemoveWhitespace => text.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

impl FromStr for CleaningStep {
    type Err = SpamEvalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::lookup(s.trim())
    }
}

impl fmt::Display for CleaningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
