// saw-store-sqlite/src/run_store.rs
// ============================================================================
// Module: SQLite Run Store
// Description: `SQLite`-backed implementation of `saw_core::interfaces::RunStore`.
// Purpose: Idempotent per-run header metadata: status, policy snapshot, and
//          approval attribution, keyed by `run_id`.
// Dependencies: rusqlite, saw-core
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::OptionalExtension;
use rusqlite::params;
use saw_core::identifiers::RunId;
use saw_core::interfaces::RunRecord;
use saw_core::interfaces::RunStore;
use saw_core::interfaces::RunStoreError;

/// `SQLite`-backed [`RunStore`].
#[derive(Clone)]
pub struct SqliteRunStore {
    connection: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteRunStore {
    /// Wraps an already-initialized connection.
    #[must_use]
    pub fn new(connection: Arc<Mutex<rusqlite::Connection>>) -> Self {
        Self { connection }
    }
}

impl RunStore for SqliteRunStore {
    fn upsert_start(&self, record: &RunRecord) -> Result<(), RunStoreError> {
        let guard = self.connection.lock().map_err(|_| RunStoreError::Storage("run store mutex poisoned".to_string()))?;
        guard
            .execute(
                "INSERT INTO runs
                    (run_id, saw_id, started_at, status, policy_hash, policy_version, policy_snapshot)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(run_id) DO UPDATE SET
                    saw_id = excluded.saw_id,
                    started_at = excluded.started_at,
                    status = excluded.status,
                    policy_hash = excluded.policy_hash,
                    policy_version = excluded.policy_version,
                    policy_snapshot = excluded.policy_snapshot",
                params![
                    record.run_id.as_str(),
                    record.saw_id,
                    record.started_at,
                    record.status,
                    record.policy_hash,
                    record.policy_version,
                    record.policy_snapshot,
                ],
            )
            .map_err(|err| RunStoreError::Storage(err.to_string()))?;
        Ok(())
    }

    fn update_status(&self, run_id: &RunId, status: &str) -> Result<(), RunStoreError> {
        let guard = self.connection.lock().map_err(|_| RunStoreError::Storage("run store mutex poisoned".to_string()))?;
        guard
            .execute("UPDATE runs SET status = ?1 WHERE run_id = ?2", params![status, run_id.as_str()])
            .map_err(|err| RunStoreError::Storage(err.to_string()))?;
        Ok(())
    }

    fn update_approval(
        &self,
        run_id: &RunId,
        approved_by: Option<&str>,
        approved_at: Option<&str>,
        approval_note: Option<&str>,
    ) -> Result<(), RunStoreError> {
        let guard = self.connection.lock().map_err(|_| RunStoreError::Storage("run store mutex poisoned".to_string()))?;
        guard
            .execute(
                "UPDATE runs SET approved_by = ?1, approved_at = ?2, approval_note = ?3 WHERE run_id = ?4",
                params![approved_by, approved_at, approval_note, run_id.as_str()],
            )
            .map_err(|err| RunStoreError::Storage(err.to_string()))?;
        Ok(())
    }

    fn load(&self, run_id: &RunId) -> Result<RunRecord, RunStoreError> {
        let guard = self.connection.lock().map_err(|_| RunStoreError::Storage("run store mutex poisoned".to_string()))?;
        guard
            .query_row(
                "SELECT run_id, saw_id, started_at, status, policy_hash, policy_version, policy_snapshot,
                        approved_by, approved_at, approval_note
                 FROM runs WHERE run_id = ?1",
                params![run_id.as_str()],
                |row| {
                    Ok(RunRecord {
                        run_id: RunId::new(row.get::<_, String>(0)?),
                        saw_id: row.get(1)?,
                        started_at: row.get(2)?,
                        status: row.get(3)?,
                        policy_hash: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                        policy_version: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                        policy_snapshot: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                        approved_by: row.get(7)?,
                        approved_at: row.get(8)?,
                        approval_note: row.get(9)?,
                    })
                },
            )
            .optional()
            .map_err(|err| RunStoreError::Storage(err.to_string()))?
            .ok_or_else(|| RunStoreError::NotFound(run_id.as_str().to_string()))
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<RunId, RunStoreError> {
        let guard = self.connection.lock().map_err(|_| RunStoreError::Storage("run store mutex poisoned".to_string()))?;
        let mut stmt = guard
            .prepare("SELECT run_id FROM runs WHERE run_id LIKE ?1 ESCAPE '\\' ORDER BY run_id")
            .map_err(|err| RunStoreError::Storage(err.to_string()))?;
        let escaped = prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let pattern = format!("{escaped}%");
        let matches: Vec<String> = stmt
            .query_map(params![pattern], |row| row.get(0))
            .map_err(|err| RunStoreError::Storage(err.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| RunStoreError::Storage(err.to_string()))?;

        match matches.as_slice() {
            [] => Err(RunStoreError::NotFound(prefix.to_string())),
            [single] => Ok(RunId::new(single.clone())),
            _ => Err(RunStoreError::AmbiguousPrefix(prefix.to_string())),
        }
    }
}
