use crate::model::ModelDescriptor;

/// Output vocabulary for one classification entry point.
///
/// The decision rule exists once; the label strings differ per consumption
/// path. File-based batch scoring emits `"pos"`/`"neg"`, store-backed
/// processing emits `"HIGH"`/`"LOW"`, and downstream consumers key on the
/// exact strings, so the two vocabularies are never unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    /// `"pos"` / `"neg"`, used by the file-based batch path.
    PosNeg,
    /// `"HIGH"` / `"LOW"`, used by the store-backed path.
    HighLow,
}

impl Vocabulary {
    /// The label for values at or above the threshold.
    pub fn positive(self) -> &'static str {
        match self {
            Vocabulary::PosNeg => "pos",
            Vocabulary::HighLow => "HIGH",
        }
    }

    /// The label for values below the threshold.
    pub fn negative(self) -> &'static str {
        match self {
            Vocabulary::PosNeg => "neg",
            Vocabulary::HighLow => "LOW",
        }
    }
}

/// Maps numeric observations to labels under one model configuration.
///
/// Classification is pure and deterministic: no I/O, O(1) per value. The
/// descriptor is held for the classifier's lifetime so every prediction in
/// a run carries the same model identity.
///
/// # Example
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use thresher::{Classifier, ModelDescriptor, Vocabulary};
///
/// let dir = std::env::temp_dir().join("thresher-doc-classifier");
/// std::fs::create_dir_all(&dir)?;
/// let path = dir.join("model.yaml");
/// std::fs::write(&path, "model_version: \"1.0.0\"\nparams:\n  theta_low: 0.6\n")?;
///
/// let classifier = Classifier::new(ModelDescriptor::load(&path)?, Vocabulary::PosNeg);
/// assert_eq!(classifier.classify(0.6), "pos");
/// assert_eq!(classifier.classify(0.5999), "neg");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Classifier {
    descriptor: ModelDescriptor,
    vocabulary: Vocabulary,
}

impl Classifier {
    pub fn new(descriptor: ModelDescriptor, vocabulary: Vocabulary) -> Self {
        Self {
            descriptor,
            vocabulary,
        }
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    /// Classifies one value. The boundary is inclusive: exact equality
    /// with the effective threshold takes the positive branch.
    pub fn classify(&self, value: f64) -> &'static str {
        if value >= self.descriptor.effective_threshold() {
            self.vocabulary.positive()
        } else {
            self.vocabulary.negative()
        }
    }
}
