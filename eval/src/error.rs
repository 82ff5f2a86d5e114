// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Error types for the spam evaluation toolkit

use thiserror::Error;

/// Result type alias for toolkit operations
pub type Result<T> = std::result::Result<T, SpamEvalError>;

/// Toolkit error types
#[derive(Error, Debug)]
pub enum SpamEvalError {
    /// A cleaning step name is not in the registry
    #[error("Unknown cleaning step '{name}' (available: {available})")]
    UnknownStep { name: String, available: String },

    /// Test fraction outside the open interval (0, 1)
    #[error("Invalid split: test fraction must be in (0, 1), got {0}")]
    InvalidSplit(f64),

    /// Label present at transform time but absent when the encoder was fit
    #[error("Label '{0}' was not seen when the label encoder was fit")]
    UnseenLabel(String),

    /// No training texts, or only one class among the training labels
    #[error("Empty training set: {0}")]
    EmptyTrainingSet(String),

    /// Algorithm is selectable but has no trainer behind it
    #[error("Algorithm '{0}' is not implemented")]
    UnsupportedAlgorithm(String),

    /// Dataset name is not part of the catalog
    #[error("Unknown dataset '{0}'")]
    UnknownDataset(String),

    /// Raw table lacks a usable text or label column
    #[error("Missing {role} column (looked for: {candidates})")]
    MissingColumn { role: &'static str, candidates: String },

    /// Parallel slices of different lengths
    #[error("Length mismatch: {what} ({left} vs {right})")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    /// Encoded label outside {0, 1}
    #[error("Invalid encoded label {0}: expected 0 or 1")]
    InvalidEncodedLabel(u8),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
