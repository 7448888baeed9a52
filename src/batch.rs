use log::{debug, error, info};

use crate::classifier::{Classifier, Vocabulary};
use crate::model::ModelDescriptor;
use crate::store::{RecordStore, StoreError};

/// Orchestrates one claim/classify/commit cycle over a record store.
///
/// The runner owns the store handle and a classifier bound to the
/// store-path vocabulary (`"HIGH"`/`"LOW"`). Each cycle claims the
/// currently unprocessed records once, then commits predictions
/// one-by-one; a record whose commit fails is released back to the pool
/// and retried on a later cycle, while the rest of the batch continues.
/// The safe failure direction is under-counting: a record is only ever
/// counted after its commit landed.
///
/// Scheduling is external. The runner performs exactly one cycle per
/// [`run_cycle`](BatchRunner::run_cycle) call and never retries a failed
/// connection in-process.
pub struct BatchRunner<S: RecordStore> {
    store: S,
    classifier: Classifier,
}

impl<S: RecordStore> BatchRunner<S> {
    /// Creates a runner for one model configuration. The descriptor is
    /// held for the runner's lifetime, so every prediction the runner
    /// commits carries the same model identity.
    pub fn new(store: S, descriptor: ModelDescriptor) -> Self {
        Self {
            store,
            classifier: Classifier::new(descriptor, Vocabulary::HighLow),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Runs one cycle and returns the number of records actually
    /// committed: never more than the number claimed, and possibly fewer
    /// when individual commits fail.
    ///
    /// Claim and connection failures abort the cycle; per-record commit
    /// failures are logged, release the record for the next cycle, and do
    /// not roll back predictions already committed this cycle.
    pub fn run_cycle(&mut self) -> Result<usize, StoreError> {
        let claimed = self.store.claim_unprocessed()?;
        if claimed.is_empty() {
            info!("No unprocessed records found");
            return Ok(0);
        }

        let identity = self.classifier.descriptor().identity().to_string();
        let mut committed = 0;
        for observation in &claimed {
            let label = self.classifier.classify(observation.value);
            match self
                .store
                .commit_prediction(observation.id, label, &identity)
            {
                Ok(()) => {
                    debug!(
                        "Updated record {}: data={}, prediction={}",
                        observation.id, observation.value, label
                    );
                    committed += 1;
                }
                Err(e) => {
                    error!("{}", e);
                    if let Err(release_err) = self.store.release_claim(observation.id) {
                        error!(
                            "Failed to release claim on record {}: {}",
                            observation.id, release_err
                        );
                    }
                }
            }
        }

        info!("Processed {} of {} claimed records", committed, claimed.len());
        Ok(committed)
    }

    /// Consumes the runner, handing back the store.
    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Observation;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn descriptor_with_threshold(threshold: f64) -> ModelDescriptor {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.yaml");
        fs::write(
            &path,
            format!("model_version: \"1.0.0\"\nparams:\n  theta_low: {}\n", threshold),
        )
        .unwrap();
        ModelDescriptor::load(&path).unwrap()
    }

    #[derive(Debug)]
    struct StubRow {
        id: i64,
        value: f64,
        claimed: bool,
        processed: bool,
        predicted: Option<String>,
        model_used: Option<String>,
    }

    /// In-memory store with per-record commit failure injection.
    #[derive(Debug, Default)]
    struct StubStore {
        rows: Vec<StubRow>,
        fail_commit_for: HashSet<i64>,
    }

    impl StubStore {
        fn with_values(values: &[f64]) -> Self {
            let rows = values
                .iter()
                .enumerate()
                .map(|(i, &value)| StubRow {
                    id: i as i64 + 1,
                    value,
                    claimed: false,
                    processed: false,
                    predicted: None,
                    model_used: None,
                })
                .collect();
            Self {
                rows,
                fail_commit_for: HashSet::new(),
            }
        }
    }

    impl RecordStore for StubStore {
        fn claim_unprocessed(&mut self) -> Result<Vec<Observation>, StoreError> {
            let mut claimed = Vec::new();
            for row in self.rows.iter_mut().filter(|r| !r.processed && !r.claimed) {
                row.claimed = true;
                claimed.push(Observation {
                    id: row.id,
                    created_at: None,
                    value: row.value,
                });
            }
            Ok(claimed)
        }

        fn commit_prediction(
            &mut self,
            id: i64,
            label: &str,
            model_identity: &str,
        ) -> Result<(), StoreError> {
            if self.fail_commit_for.contains(&id) {
                return Err(StoreError::Commit {
                    id,
                    reason: "injected failure".to_string(),
                });
            }
            let row = self.rows.iter_mut().find(|r| r.id == id).unwrap();
            row.processed = true;
            row.claimed = false;
            row.predicted = Some(label.to_string());
            row.model_used = Some(model_identity.to_string());
            Ok(())
        }

        fn release_claim(&mut self, id: i64) -> Result<(), StoreError> {
            if let Some(row) = self.rows.iter_mut().find(|r| r.id == id && !r.processed) {
                row.claimed = false;
            }
            Ok(())
        }
    }

    #[test]
    fn test_cycle_processes_all_claimed_records() {
        let store = StubStore::with_values(&[10.0, 60.0, 90.0]);
        let mut runner = BatchRunner::new(store, descriptor_with_threshold(50.0));
        let identity = runner.classifier().descriptor().identity().to_string();

        assert_eq!(runner.run_cycle().unwrap(), 3);

        let store = runner.into_store();
        let labels: Vec<_> = store
            .rows
            .iter()
            .map(|r| r.predicted.as_deref().unwrap().to_string())
            .collect();
        assert_eq!(labels, vec!["LOW", "HIGH", "HIGH"]);
        assert!(store.rows.iter().all(|r| r.processed));
        assert!(store
            .rows
            .iter()
            .all(|r| r.model_used.as_deref() == Some(identity.as_str())));
    }

    #[test]
    fn test_empty_store_reports_zero() {
        let store = StubStore::with_values(&[]);
        let mut runner = BatchRunner::new(store, descriptor_with_threshold(50.0));
        assert_eq!(runner.run_cycle().unwrap(), 0);
    }

    #[test]
    fn test_commit_failure_skips_record_and_continues() {
        let mut store = StubStore::with_values(&[10.0, 60.0, 90.0]);
        store.fail_commit_for.insert(2);
        let mut runner = BatchRunner::new(store, descriptor_with_threshold(50.0));

        // The failed record is skipped, the rest of the batch commits.
        assert_eq!(runner.run_cycle().unwrap(), 2);

        let store = runner.into_store();
        let failed = store.rows.iter().find(|r| r.id == 2).unwrap();
        assert!(!failed.processed);
        assert!(!failed.claimed, "failed record must return to the pool");
        assert!(failed.predicted.is_none());
        assert!(store.rows.iter().filter(|r| r.processed).count() == 2);
    }

    #[test]
    fn test_failed_record_is_retried_next_cycle() {
        let mut store = StubStore::with_values(&[60.0]);
        store.fail_commit_for.insert(1);
        let mut runner = BatchRunner::new(store, descriptor_with_threshold(50.0));

        assert_eq!(runner.run_cycle().unwrap(), 0);

        // The transient failure clears; the next cycle picks the record up.
        let mut store = runner.into_store();
        store.fail_commit_for.clear();
        let mut runner = BatchRunner::new(store, descriptor_with_threshold(50.0));
        assert_eq!(runner.run_cycle().unwrap(), 1);
    }

    #[test]
    fn test_count_never_exceeds_claimed() {
        let store = StubStore::with_values(&[1.0, 2.0, 3.0, 4.0]);
        let mut runner = BatchRunner::new(store, descriptor_with_threshold(2.5));
        let committed = runner.run_cycle().unwrap();
        assert!(committed <= 4);
        assert_eq!(committed, 4);
        // A second cycle finds nothing left.
        assert_eq!(runner.run_cycle().unwrap(), 0);
    }
}
