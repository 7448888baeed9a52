use std::io;

use log::info;

use crate::classifier::{Classifier, Vocabulary};
use crate::model::ModelDescriptor;

/// Errors raised while materializing a file batch. Any of these fails the
/// whole batch before classification starts.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Input CSV must contain a 'data' column")]
    MissingValueColumn,
    #[error("Invalid value {value:?} in row {row}: not a number")]
    InvalidValue { row: usize, value: String },
    #[error("Malformed row {row}: expected {expected} fields, found {found}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// One observation from a file batch.
///
/// The core schema is fixed (`id`, `created_at`, `data`); every other
/// input column is carried in `extra`, in input order, and passed through
/// to the output untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    /// Value of the `id` column, or the 1-based row position when the
    /// input has no `id` column.
    pub id: String,
    pub created_at: Option<String>,
    /// Value of the required `data` column.
    pub value: f64,
    /// Additional columns, preserved verbatim as `(name, value)` pairs.
    pub extra: Vec<(String, String)>,
}

impl InputRecord {
    pub fn new(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            created_at: None,
            value,
            extra: Vec::new(),
        }
    }
}

/// An input record enriched with its prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub record: InputRecord,
    pub predicted: String,
    /// Always empty in this mode; the column is kept for output-schema
    /// compatibility with scoring paths that emit probabilities.
    pub proba: Option<f64>,
    pub model_used: String,
}

/// The stateless batch path: classifies materialized records with no
/// claim/commit machinery behind them.
///
/// A run is a pure transformation: either the whole batch was already
/// validated at load time and succeeds, or the load failed outright with
/// an [`InputError`]. Labels use the `"pos"`/`"neg"` vocabulary.
pub struct FileRunner {
    classifier: Classifier,
}

impl FileRunner {
    /// Creates a runner for one model configuration; every result in a
    /// run carries the descriptor's identity.
    pub fn new(descriptor: ModelDescriptor) -> Self {
        Self {
            classifier: Classifier::new(descriptor, Vocabulary::PosNeg),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Classifies the whole batch, enriching each record with its label
    /// and the model identity.
    pub fn run(&self, records: Vec<InputRecord>) -> Vec<PredictionResult> {
        let identity = self.classifier.descriptor().identity();
        let results: Vec<PredictionResult> = records
            .into_iter()
            .map(|record| {
                let predicted = self.classifier.classify(record.value).to_string();
                PredictionResult {
                    record,
                    predicted,
                    proba: None,
                    model_used: identity.to_string(),
                }
            })
            .collect();
        info!("Classified {} records", results.len());
        results
    }
}
