use std::path::{Path, PathBuf};

use chrono::{Duration, SecondsFormat, Utc};
use rusqlite::Connection;

/// Errors raised by the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(#[source] rusqlite::Error),
    #[error("Store query failed: {0}")]
    Query(#[source] rusqlite::Error),
    #[error("Failed to commit prediction for record {id}: {reason}")]
    Commit { id: i64, reason: String },
}

/// One numeric observation claimed from the store, awaiting a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub id: i64,
    pub created_at: Option<String>,
    pub value: f64,
}

/// The narrow contract the processing cycle depends on.
///
/// A record moves `UNPROCESSED -> CLAIMED -> PROCESSED`: claiming reserves
/// it for exactly one cycle, committing stamps the prediction and model
/// identity, and releasing returns a failed record to the unclaimed pool
/// so a later cycle retries it.
pub trait RecordStore {
    /// Atomically claims every unprocessed, unclaimed record and returns
    /// the claimed set.
    fn claim_unprocessed(&mut self) -> Result<Vec<Observation>, StoreError>;

    /// Commits a prediction for a single record. Each commit is an
    /// independent transaction; already-processed records reject the
    /// commit rather than being relabeled.
    fn commit_prediction(
        &mut self,
        id: i64,
        label: &str,
        model_identity: &str,
    ) -> Result<(), StoreError>;

    /// Returns a claimed record to the unclaimed pool.
    fn release_claim(&mut self, id: i64) -> Result<(), StoreError>;
}

/// SQLite-backed record store over the `input_table` schema.
///
/// The connection is owned by the store instance, opened lazily on first
/// use, and closed when the store is dropped, whichever way the cycle
/// exits. Claims are leases: a `claimed_at` stamp older than the lease
/// window (a crashed cycle) no longer shields the record, so at most one
/// live cycle processes a given record while nothing is lost.
pub struct SqliteStore {
    path: PathBuf,
    lease: Duration,
    conn: Option<Connection>,
}

impl SqliteStore {
    /// Default claim lease, matching the scheduling interval the cycle is
    /// expected to run at.
    pub const DEFAULT_LEASE_MINUTES: i64 = 10;

    /// Creates a store handle for the database at `path`. No connection
    /// is opened until the first operation needs one.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_lease(path, Duration::minutes(Self::DEFAULT_LEASE_MINUTES))
    }

    /// Creates a store handle with an explicit claim lease window.
    pub fn with_lease<P: AsRef<Path>>(path: P, lease: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lease,
            conn: None,
        }
    }

    fn conn(&mut self) -> Result<&Connection, StoreError> {
        if self.conn.is_none() {
            let conn = Connection::open(&self.path).map_err(StoreError::Connection)?;
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS input_table (
                  id          INTEGER PRIMARY KEY AUTOINCREMENT,
                  created_at  TEXT,
                  data        REAL NOT NULL,
                  processed   INTEGER NOT NULL DEFAULT 0,
                  claimed_at  TEXT,
                  predicted   TEXT,
                  model_used  TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_input_unprocessed
                  ON input_table(processed, claimed_at);
                "#,
            )
            .map_err(StoreError::Connection)?;
            log::info!("Connected to record store at {}", self.path.display());
            self.conn = Some(conn);
        }
        Ok(self.conn.as_ref().unwrap())
    }

    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Inserts a new unprocessed observation, returning its id.
    pub fn insert_observation(&mut self, value: f64) -> Result<i64, StoreError> {
        let now = Self::now();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO input_table (created_at, data, processed) VALUES (?1, ?2, 0)",
            (&now, value),
        )
        .map_err(StoreError::Query)?;
        Ok(conn.last_insert_rowid())
    }

    /// Number of records still awaiting a prediction.
    pub fn unprocessed_count(&mut self) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COUNT(*) FROM input_table WHERE processed = 0",
            (),
            |row| row.get(0),
        )
        .map_err(StoreError::Query)
    }

    /// The committed `(predicted, model_used)` pair for a record, or
    /// `None` while it is still unprocessed.
    pub fn fetch_prediction(&mut self, id: i64) -> Result<Option<(String, String)>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT predicted, model_used FROM input_table WHERE id = ?1 AND processed = 1",
            )
            .map_err(StoreError::Query)?;
        let mut rows = stmt.query([id]).map_err(StoreError::Query)?;
        if let Some(row) = rows.next().map_err(StoreError::Query)? {
            let predicted: String = row.get(0).map_err(StoreError::Query)?;
            let model_used: String = row.get(1).map_err(StoreError::Query)?;
            return Ok(Some((predicted, model_used)));
        }
        Ok(None)
    }
}

impl RecordStore for SqliteStore {
    fn claim_unprocessed(&mut self) -> Result<Vec<Observation>, StoreError> {
        let now = Utc::now();
        let stamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        let cutoff = (now - self.lease).to_rfc3339_opts(SecondsFormat::Micros, true);

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                r#"
                UPDATE input_table
                SET claimed_at = ?1
                WHERE processed = 0 AND (claimed_at IS NULL OR claimed_at < ?2)
                RETURNING id, created_at, data
                "#,
            )
            .map_err(StoreError::Query)?;
        let rows = stmt
            .query_map((&stamp, &cutoff), |row| {
                Ok(Observation {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    value: row.get(2)?,
                })
            })
            .map_err(StoreError::Query)?;

        let mut claimed = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Query)?;
        // Stable order for deterministic cycles.
        claimed.sort_by_key(|obs| obs.id);
        Ok(claimed)
    }

    fn commit_prediction(
        &mut self,
        id: i64,
        label: &str,
        model_identity: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let affected = conn
            .execute(
                r#"
                UPDATE input_table
                SET predicted = ?1, model_used = ?2, processed = 1, claimed_at = NULL
                WHERE id = ?3 AND processed = 0
                "#,
                (label, model_identity, id),
            )
            .map_err(|e| StoreError::Commit {
                id,
                reason: e.to_string(),
            })?;

        if affected == 0 {
            return Err(StoreError::Commit {
                id,
                reason: "record is missing or already processed".to_string(),
            });
        }
        Ok(())
    }

    fn release_claim(&mut self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE input_table SET claimed_at = NULL WHERE id = ?1 AND processed = 0",
            [id],
        )
        .map_err(StoreError::Query)?;
        Ok(())
    }
}
