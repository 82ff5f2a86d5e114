// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Email datasets: raw tables, dataset-level cleaning and the dataset catalog

use crate::error::{Result, SpamEvalError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Binary label for spam detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Legitimate email
    Ham,
    /// Unsolicited email
    Spam,
}

impl Label {
    /// Numeric class (ham = 0, spam = 1)
    pub fn to_binary(&self) -> u8 {
        match self {
            Label::Ham => 0,
            Label::Spam => 1,
        }
    }

    /// Create from binary prediction (1 = spam, anything else = ham)
    pub fn from_binary(value: u8) -> Self {
        if value == 1 {
            Label::Spam
        } else {
            Label::Ham
        }
    }

    /// Parse a source label in any of the encodings found in the wild
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "spam" | "1" | "1.0" | "true" => Some(Label::Spam),
            "ham" | "not spam" | "0" | "0.0" | "false" => Some(Label::Ham),
            _ => None,
        }
    }

    /// Canonical value written back to tables
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Ham => "ham",
            Label::Spam => "spam",
        }
    }

    /// Name used in reports and confusion matrix axes
    pub fn display_name(&self) -> &'static str {
        match self {
            Label::Ham => "Not Spam",
            Label::Spam => "Spam",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cleaned email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Stable identifier
    pub id: String,
    /// Message text
    pub body: String,
    /// Ground truth label
    pub label: Label,
}

/// Untyped table as handed over by a loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub source: String,
    pub columns: Vec<String>,
    /// Missing cells are `None`
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(source: &str, columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            source: source.to_string(),
            columns,
            rows,
        }
    }

    /// Read a headered CSV; empty cells and cells past a short row become `None`
    pub fn from_csv_reader<R: Read>(source: &str, reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();

        for result in reader.records() {
            let record = result?;
            let row = (0..columns.len())
                .map(|i| record.get(i).filter(|v| !v.is_empty()).map(|v| v.to_string()))
                .collect();
            rows.push(row);
        }

        tracing::debug!("Read {} rows x {} columns from {}", rows.len(), columns.len(), source);
        Ok(Self::new(source, columns, rows))
    }

    pub fn from_csv_path(source: &str, path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(source, file)
    }

    /// Index of the first column whose name matches a candidate, ignoring case
    pub fn find_column(&self, candidates: &[String]) -> Option<usize> {
        candidates.iter().find_map(|candidate| {
            self.columns
                .iter()
                .position(|c| c.trim().eq_ignore_ascii_case(candidate))
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An ordered, immutable collection of cleaned emails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    source: String,
    samples: Vec<Sample>,
}

impl Dataset {
    pub fn new(source: &str, samples: Vec<Sample>) -> Self {
        Self {
            source: source.to_string(),
            samples,
        }
    }

    /// Provenance tag
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.samples.iter().map(|s| s.body.clone()).collect()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.samples.iter().map(|s| s.label).collect()
    }

    /// Join several datasets; sources are combined with `+`
    pub fn concat(datasets: &[Dataset]) -> Self {
        let source = datasets
            .iter()
            .map(|d| d.source.as_str())
            .collect::<Vec<_>>()
            .join("+");
        let samples = datasets.iter().flat_map(|d| d.samples.iter().cloned()).collect();
        Self { source, samples }
    }

    /// Canonical `Id`/`Body`/`Label` table
    pub fn to_table(&self) -> RawTable {
        let rows = self
            .samples
            .iter()
            .map(|s| {
                vec![
                    Some(s.id.clone()),
                    Some(s.body.clone()),
                    Some(s.label.as_str().to_string()),
                ]
            })
            .collect();
        RawTable::new(
            &self.source,
            vec![ID_COLUMN.to_string(), BODY_COLUMN.to_string(), LABEL_COLUMN.to_string()],
            rows,
        )
    }

    /// SHA-256 over ids, bodies and labels, in order
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for sample in &self.samples {
            hasher.update(sample.id.as_bytes());
            hasher.update([0u8]);
            hasher.update(sample.body.as_bytes());
            hasher.update([0u8]);
            hasher.update([sample.label.to_binary()]);
            hasher.update([b'\n']);
        }
        hex::encode(hasher.finalize())
    }

    /// Get label distribution for a set of samples
    pub fn label_distribution(samples: &[Sample]) -> HashMap<Label, usize> {
        let mut dist = HashMap::new();
        for sample in samples {
            *dist.entry(sample.label).or_insert(0) += 1;
        }
        dist
    }
}

pub const ID_COLUMN: &str = "Id";
pub const BODY_COLUMN: &str = "Body";
pub const LABEL_COLUMN: &str = "Label";

/// Outcome of a cleaning pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_kept: usize,
    pub dropped_missing_text: usize,
    pub dropped_bad_label: usize,
}

impl CleaningReport {
    pub fn dropped(&self) -> usize {
        self.dropped_missing_text + self.dropped_bad_label
    }
}

/// Dataset-level normalization run once before any per-record pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetCleaner {
    /// Accepted names for the message text column, in priority order
    pub text_columns: Vec<String>,
    /// Accepted names for the label column, in priority order
    pub label_columns: Vec<String>,
    /// Accepted names for a stable row id column
    pub id_columns: Vec<String>,
}

impl Default for DatasetCleaner {
    fn default() -> Self {
        Self {
            text_columns: ["body", "text", "message", "email", "content"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            label_columns: ["label", "spam", "class", "category", "target"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            id_columns: vec!["id".to_string()],
        }
    }
}

impl DatasetCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize columns and labels, dropping malformed rows
    pub fn clean(&self, table: &RawTable) -> Result<Dataset> {
        let (dataset, report) = self.clean_with_report(table)?;
        if report.dropped() > 0 {
            tracing::warn!(
                "Dropped {} of {} rows from {} ({} missing text, {} bad label)",
                report.dropped(),
                report.rows_in,
                table.source,
                report.dropped_missing_text,
                report.dropped_bad_label
            );
        }
        Ok(dataset)
    }

    pub fn clean_with_report(&self, table: &RawTable) -> Result<(Dataset, CleaningReport)> {
        let text_idx = table
            .find_column(&self.text_columns)
            .ok_or_else(|| SpamEvalError::MissingColumn {
                role: "text",
                candidates: self.text_columns.join(", "),
            })?;
        let label_idx = table
            .find_column(&self.label_columns)
            .ok_or_else(|| SpamEvalError::MissingColumn {
                role: "label",
                candidates: self.label_columns.join(", "),
            })?;
        let id_idx = table.find_column(&self.id_columns);

        let mut report = CleaningReport {
            rows_in: table.len(),
            ..CleaningReport::default()
        };
        let mut samples = Vec::with_capacity(table.len());

        for (row_idx, row) in table.rows.iter().enumerate() {
            let cell = |idx: usize| row.get(idx).and_then(|c| c.as_deref());

            let Some(body) = cell(text_idx) else {
                report.dropped_missing_text += 1;
                continue;
            };
            let Some(label) = cell(label_idx).and_then(Label::parse) else {
                report.dropped_bad_label += 1;
                continue;
            };
            let id = id_idx
                .and_then(cell)
                .map(|id| id.to_string())
                .unwrap_or_else(|| format!("{}_{}", table.source, row_idx));

            samples.push(Sample {
                id,
                body: body.to_string(),
                label,
            });
        }

        report.rows_kept = samples.len();
        tracing::info!(
            "Cleaned {}: {} rows kept of {}",
            table.source,
            report.rows_kept,
            report.rows_in
        );

        Ok((Dataset::new(&table.source, samples), report))
    }
}

/// Number of emails in the generated dataset
pub const SYNTHETIC_SIZE: usize = 1000;

/// Named datasets selectable from the front-ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetId {
    SpamAssassin,
    EnronSpam,
    LingSpam,
    Synthetic,
}

impl DatasetId {
    pub fn all() -> &'static [DatasetId] {
        &[
            DatasetId::SpamAssassin,
            DatasetId::EnronSpam,
            DatasetId::LingSpam,
            DatasetId::Synthetic,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DatasetId::SpamAssassin => "Spam Assassin",
            DatasetId::EnronSpam => "EnronSpam",
            DatasetId::LingSpam => "LingSpam",
            DatasetId::Synthetic => "Synthetic",
        }
    }

    /// CSV file inside the dataset directory, `None` for generated data
    pub fn file_name(&self) -> Option<&'static str> {
        match self {
            DatasetId::SpamAssassin => Some("completeSpamAssassin.csv"),
            DatasetId::EnronSpam => Some("enronSpamSubset.csv"),
            DatasetId::LingSpam => Some("lingSpam.csv"),
            DatasetId::Synthetic => None,
        }
    }

    /// Load the raw table; `seed` only affects generated data
    pub fn load(&self, data_dir: &Path, seed: u64) -> Result<RawTable> {
        match self.file_name() {
            Some(file) => {
                let path = data_dir.join(file);
                tracing::info!("Loading {} from {}", self.display_name(), path.display());
                RawTable::from_csv_path(self.display_name(), &path)
            }
            None => {
                tracing::info!("Generating synthetic dataset with seed {}", seed);
                Ok(synthetic_table(SYNTHETIC_SIZE, seed))
            }
        }
    }
}

impl FromStr for DatasetId {
    type Err = SpamEvalError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "spamassassin" | "completespamassassin" => Ok(DatasetId::SpamAssassin),
            "enronspam" | "enron" | "enronspamsubset" => Ok(DatasetId::EnronSpam),
            "lingspam" | "ling" => Ok(DatasetId::LingSpam),
            "synthetic" => Ok(DatasetId::Synthetic),
            _ => Err(SpamEvalError::UnknownDataset(s.to_string())),
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Generate a raw email table for development/testing.
///
/// Labels use the 0/1 encoding and bodies carry links, digits, punctuation
/// and newlines so every cleaning step has work to do.
pub fn synthetic_table(size: usize, seed: u64) -> RawTable {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let spam_phrases = [
        "WIN a FREE iPhone now!!! Click http://prizes.example.com/claim",
        "Cheap meds, no prescription needed. Order at https://pharma.example.net",
        "You have been selected for a $1000 gift card. Act NOW",
        "Limited offer: earn money from home, 100% guaranteed!!!",
        "URGENT: your account is suspended, verify at http://secure-login.example.org",
    ];

    let ham_phrases = [
        "Hi team,\nthe meeting is moved to 3pm tomorrow.",
        "Attached are the minutes from Monday's review.",
        "Can we meet for lunch on Friday? Let me know.",
        "The build is green again, thanks for the quick fix.",
        "Reminder: quarterly report drafts are due next week.",
    ];

    let rows = (0..size)
        .map(|i| {
            let is_spam = rng.gen_bool(0.4);
            let phrases = if is_spam { &spam_phrases } else { &ham_phrases };
            let phrase_idx = rng.gen_range(0..phrases.len());

            vec![
                Some(format!("{}\r\nref {}", phrases[phrase_idx], i)),
                Some(if is_spam { "1" } else { "0" }.to_string()),
            ]
        })
        .collect();

    RawTable::new(
        DatasetId::Synthetic.display_name(),
        vec![BODY_COLUMN.to_string(), LABEL_COLUMN.to_string()],
        rows,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    fn messy_table() -> RawTable {
        RawTable::new(
            "messy",
            vec!["Unnamed: 0".to_string(), "text".to_string(), "SPAM".to_string()],
            vec![
                vec![Some("0".into()), Some("Win money now".into()), Some("1".into())],
                vec![Some("1".into()), Some("Lunch at noon?".into()), Some(" Ham ".into())],
                vec![Some("2".into()), None, Some("spam".into())],
                vec![Some("3".into()), Some("Who knows".into()), Some("maybe".into())],
                vec![Some("4".into()), Some("".into()), Some("0.0".into())],
                vec![Some("5".into()), Some("Short row".into())],
            ],
        )
    }

    #[test]
    fn test_label_parse() {
        assert_eq!(Label::parse("spam"), Some(Label::Spam));
        assert_eq!(Label::parse(" SPAM "), Some(Label::Spam));
        assert_eq!(Label::parse("1"), Some(Label::Spam));
        assert_eq!(Label::parse("1.0"), Some(Label::Spam));
        assert_eq!(Label::parse("ham"), Some(Label::Ham));
        assert_eq!(Label::parse("Not Spam"), Some(Label::Ham));
        assert_eq!(Label::parse("0"), Some(Label::Ham));
        assert_eq!(Label::parse("2"), None);
        assert_eq!(Label::parse(""), None);
    }

    #[test]
    fn test_clean_normalizes_and_drops() {
        let (dataset, report) = DatasetCleaner::new().clean_with_report(&messy_table()).unwrap();

        assert_eq!(report.rows_in, 6);
        assert_eq!(report.rows_kept, 3);
        assert_eq!(report.dropped_missing_text, 1);
        assert_eq!(report.dropped_bad_label, 2);

        let labels = dataset.labels();
        assert_eq!(labels, vec![Label::Spam, Label::Ham, Label::Ham]);
        // Empty text is legal
        assert_eq!(dataset.samples()[2].body, "");
        assert_eq!(dataset.samples()[0].id, "messy_0");
        assert_eq!(dataset.samples()[2].id, "messy_4");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let cleaner = DatasetCleaner::new();
        let once = cleaner.clean(&messy_table()).unwrap();
        let twice = cleaner.clean(&once.to_table()).unwrap();
        assert_eq!(once, twice);

        let synthetic = cleaner.clean(&synthetic_table(50, 7)).unwrap();
        assert_eq!(cleaner.clean(&synthetic.to_table()).unwrap(), synthetic);
    }

    #[test]
    fn test_clean_missing_columns() {
        let table = RawTable::new("bad", vec!["subject".to_string(), "label".to_string()], vec![]);
        let err = DatasetCleaner::new().clean(&table).unwrap_err();
        assert!(matches!(err, SpamEvalError::MissingColumn { role: "text", .. }));

        let table = RawTable::new("bad", vec!["Body".to_string()], vec![]);
        let err = DatasetCleaner::new().clean(&table).unwrap_err();
        assert!(matches!(err, SpamEvalError::MissingColumn { role: "label", .. }));
    }

    #[test]
    fn test_csv_loading() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            ",Body,Label\n0,\"Hello,\nworld\",0\n1,,1\n2,Buy now,1\n"
        )
        .unwrap();

        let table = RawTable::from_csv_path("csv", file.path()).unwrap();
        assert_eq!(table.columns, vec!["", "Body", "Label"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0][1].as_deref(), Some("Hello,\nworld"));
        assert_eq!(table.rows[1][1], None);

        let dataset = DatasetCleaner::new().clean(&table).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.samples()[1].label, Label::Spam);
    }

    #[test]
    fn test_dataset_catalog() {
        assert_eq!("Spam Assassin".parse::<DatasetId>().unwrap(), DatasetId::SpamAssassin);
        assert_eq!("enron-spam".parse::<DatasetId>().unwrap(), DatasetId::EnronSpam);
        assert_eq!("ling_spam".parse::<DatasetId>().unwrap(), DatasetId::LingSpam);
        assert!(matches!(
            "trec".parse::<DatasetId>(),
            Err(SpamEvalError::UnknownDataset(_))
        ));
        assert_eq!(DatasetId::LingSpam.file_name(), Some("lingSpam.csv"));
        assert_eq!(DatasetId::Synthetic.file_name(), None);

        assert_eq!(DatasetId::all().len(), 4);
        for id in DatasetId::all() {
            assert_eq!(id.display_name().parse::<DatasetId>().unwrap(), *id);
        }
    }

    #[test]
    fn test_synthetic_table() {
        let table = DatasetId::Synthetic.load(Path::new("unused"), 42).unwrap();
        assert_eq!(table.len(), SYNTHETIC_SIZE);
        assert_eq!(table, synthetic_table(SYNTHETIC_SIZE, 42));

        let dataset = DatasetCleaner::new().clean(&table).unwrap();
        let dist = Dataset::label_distribution(dataset.samples());
        assert!(dist.get(&Label::Spam).copied().unwrap_or(0) > 0);
        assert!(dist.get(&Label::Ham).copied().unwrap_or(0) > 0);
    }

    #[test]
    fn test_concat_and_fingerprint() {
        let cleaner = DatasetCleaner::new();
        let a = cleaner.clean(&synthetic_table(10, 1)).unwrap();
        let b = cleaner.clean(&messy_table()).unwrap();
        let joined = Dataset::concat(&[a.clone(), b.clone()]);

        assert_eq!(joined.source(), "Synthetic+messy");
        assert_eq!(joined.len(), a.len() + b.len());
        assert_eq!(a.len(), 10);

        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    fn raw_row() -> impl Strategy<Value = Vec<Option<String>>> {
        let id = prop::option::of(prop_oneof![Just(String::new()), "[a-z0-9_]{1,8}"]);
        let body = prop::option::of(any::<String>());
        let label = prop::option::of(prop::sample::select(vec![
            "spam", "ham", " SPAM ", "Not Spam", "1", "0", "1.0", "0.0", "true", "false", "maybe", "",
        ]));
        (id, body, label, 0usize..=3).prop_map(|(id, body, label, width)| {
            let mut row = vec![id, body, label.map(|l| l.to_string())];
            row.truncate(width);
            row
        })
    }

    proptest! {
        #[test]
        fn prop_clean_is_idempotent(
            header in prop::sample::select(vec![
                ["id", "Body", "label"],
                ["ID", "text", "Spam"],
                ["Id", "message", "class"],
            ]),
            rows in prop::collection::vec(raw_row(), 0..20),
        ) {
            let table = RawTable::new(
                "generated",
                header.iter().map(|h| h.to_string()).collect(),
                rows,
            );
            let cleaner = DatasetCleaner::new();
            let once = cleaner.clean(&table).unwrap();
            let twice = cleaner.clean(&once.to_table()).unwrap();
            prop_assert_eq!(twice, once);
        }
    }
}
