use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use thresher::{BatchRunner, ModelDescriptor, SqliteStore};

fn write_model(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("model.yaml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_store_cycle_end_to_end() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir, "model_version: \"1.0.0\"\nparams:\n  theta_low: 50.0\n");
    let db = dir.path().join("records.db");

    let mut store = SqliteStore::new(&db);
    for value in [10.0, 60.0, 90.0] {
        store.insert_observation(value).unwrap();
    }

    let descriptor = ModelDescriptor::load(&model).unwrap();
    let identity = descriptor.identity().to_string();
    let mut runner = BatchRunner::new(store, descriptor);
    assert_eq!(runner.run_cycle().unwrap(), 3);

    let mut store = runner.into_store();
    for (id, expected) in [(1, "LOW"), (2, "HIGH"), (3, "HIGH")] {
        let (predicted, model_used) = store.fetch_prediction(id).unwrap().unwrap();
        assert_eq!(predicted, expected);
        assert_eq!(model_used, identity);
    }
    assert_eq!(store.unprocessed_count().unwrap(), 0);

    // Everything was committed; the next cycle has nothing to do.
    let mut runner = BatchRunner::new(store, ModelDescriptor::load(&model).unwrap());
    assert_eq!(runner.run_cycle().unwrap(), 0);
}

#[test]
fn test_empty_store_cycle_reports_zero() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir, "model_version: \"1.0.0\"\nparams:\n  theta_low: 50.0\n");

    let store = SqliteStore::new(dir.path().join("records.db"));
    let mut runner = BatchRunner::new(store, ModelDescriptor::load(&model).unwrap());
    assert_eq!(runner.run_cycle().unwrap(), 0);
}

#[test]
fn test_model_evolution_never_relabels_history() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir, "model_version: \"1.0.0\"\nparams:\n  theta_low: 50.0\n");
    let db = dir.path().join("records.db");

    let mut store = SqliteStore::new(&db);
    let first = store.insert_observation(60.0).unwrap();

    let old = ModelDescriptor::load(&model).unwrap();
    let old_identity = old.identity().to_string();
    let mut runner = BatchRunner::new(store, old);
    assert_eq!(runner.run_cycle().unwrap(), 1);

    // The model configuration evolves; a new record arrives.
    fs::write(&model, "model_version: \"1.1.0\"\nparams:\n  theta_low: 70.0\n").unwrap();
    let new = ModelDescriptor::load(&model).unwrap();
    let new_identity = new.identity().to_string();
    assert_ne!(old_identity, new_identity);

    let mut store = runner.into_store();
    let second = store.insert_observation(60.0).unwrap();

    let mut runner = BatchRunner::new(store, new);
    assert_eq!(runner.run_cycle().unwrap(), 1);

    let mut store = runner.into_store();
    // The historical prediction still carries the identity that made it.
    let (predicted, model_used) = store.fetch_prediction(first).unwrap().unwrap();
    assert_eq!(predicted, "HIGH");
    assert_eq!(model_used, old_identity);
    // The same value classifies differently under the new thresholds.
    let (predicted, model_used) = store.fetch_prediction(second).unwrap().unwrap();
    assert_eq!(predicted, "LOW");
    assert_eq!(model_used, new_identity);
}

#[test]
fn test_interrupted_cycle_leaves_records_recoverable() {
    let dir = TempDir::new().unwrap();
    let model = write_model(&dir, "model_version: \"1.0.0\"\nparams:\n  theta_low: 50.0\n");
    let db = dir.path().join("records.db");

    // A cycle claims the record and then dies before committing.
    let mut store = SqliteStore::with_lease(&db, chrono::Duration::zero());
    store.insert_observation(60.0).unwrap();
    use thresher::RecordStore;
    assert_eq!(store.claim_unprocessed().unwrap().len(), 1);
    drop(store);

    // Once the lease expires, a later cycle picks the record up again.
    let store = SqliteStore::with_lease(&db, chrono::Duration::zero());
    let mut runner = BatchRunner::new(store, ModelDescriptor::load(&model).unwrap());
    assert_eq!(runner.run_cycle().unwrap(), 1);
}
