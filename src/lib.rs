//! A threshold-model inference pipeline with content-addressed model
//! identity.
//!
//! Numeric observations are classified against a versioned threshold
//! model and every prediction is stamped with the immutable identity of
//! the configuration that produced it. Two consumption paths share the
//! same model-identity and labeling semantics: a stateless file batch
//! ([`FileRunner`], `"pos"`/`"neg"`) and a SQLite-backed incremental
//! processor ([`BatchRunner`], `"HIGH"`/`"LOW"`) that claims, classifies,
//! and commits unprocessed records exactly once per observation, even
//! across crashed cycles.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use thresher::{FileRunner, InputRecord, ModelDescriptor};
//!
//! let dir = std::env::temp_dir().join("thresher-doc-lib");
//! std::fs::create_dir_all(&dir)?;
//! let model = dir.join("model.yaml");
//! std::fs::write(&model, "model_version: \"1.0.0\"\nparams:\n  theta_low: 0.6\n")?;
//!
//! let runner = FileRunner::new(ModelDescriptor::load(&model)?);
//! let results = runner.run(vec![InputRecord::new("1", 0.8)]);
//!
//! assert_eq!(results[0].predicted, "pos");
//! assert!(results[0].model_used.starts_with("threshold@1.0.0#"));
//! # Ok(())
//! # }
//! ```
//!
//! # Store-backed processing
//!
//! One cycle claims the currently unprocessed records, classifies each,
//! and commits the results one row at a time:
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use thresher::{BatchRunner, ModelDescriptor, SqliteStore};
//!
//! let dir = std::env::temp_dir().join("thresher-doc-store");
//! std::fs::create_dir_all(&dir)?;
//! # let _ = std::fs::remove_file(dir.join("records.db"));
//! let model = dir.join("model.yaml");
//! std::fs::write(&model, "model_version: \"1.0.0\"\nparams:\n  theta_low: 50.0\n")?;
//!
//! let mut store = SqliteStore::new(dir.join("records.db"));
//! store.insert_observation(75.0)?;
//!
//! let mut runner = BatchRunner::new(store, ModelDescriptor::load(&model)?);
//! let processed = runner.run_cycle()?;
//! assert_eq!(processed, 1);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod classifier;
pub mod file_runner;
pub mod io;
pub mod model;
pub mod store;

pub use batch::BatchRunner;
pub use classifier::{Classifier, Vocabulary};
pub use file_runner::{FileRunner, InputError, InputRecord, PredictionResult};
pub use model::{ConfigError, ModelDescriptor};
pub use store::{Observation, RecordStore, SqliteStore, StoreError};

pub fn init_logger() {
    env_logger::init();
}
