// saw-store-sqlite/src/ledger.rs
// ============================================================================
// Module: SQLite Ledger
// Description: `SQLite`-backed implementation of `saw_core::interfaces::Ledger`.
// Purpose: Append-only, hash-chained `execution_log` rows, one chain per
//          `run_id`, with a verification walk that recomputes the chain from
//          `GENESIS`.
// Dependencies: rusqlite, saw-core
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::OptionalExtension;
use rusqlite::params;
use saw_core::hashing::chained_hash;
use saw_core::identifiers::RunId;
use saw_core::interfaces::IntegrityReport;
use saw_core::interfaces::Ledger;
use saw_core::interfaces::LedgerEntry;
use saw_core::interfaces::LedgerEntryDraft;
use saw_core::interfaces::LedgerError;
use serde_json::json;

/// Hash-chain sentinel preceding the first entry of any run.
pub const GENESIS: &str = "GENESIS";

/// `SQLite`-backed [`Ledger`]. Cheap to clone; all handles share one
/// connection behind a mutex, matching the single-writer discipline `SQLite`
/// requires for `WAL` mode.
#[derive(Clone)]
pub struct SqliteLedger {
    connection: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteLedger {
    /// Wraps an already-initialized connection.
    #[must_use]
    pub fn new(connection: Arc<Mutex<rusqlite::Connection>>) -> Self {
        Self { connection }
    }
}

fn canonical_event_payload(
    run_id: &str,
    node_id: &str,
    tool_name: &str,
    decision: &str,
    latency_ms: f64,
    error: &str,
    timestamp: &str,
) -> serde_json::Value {
    json!({
        "run_id": run_id,
        "node_id": node_id,
        "tool_name": tool_name,
        "decision": decision,
        "latency_ms": latency_ms,
        "error": error,
        "timestamp": timestamp,
    })
}

impl Ledger for SqliteLedger {
    fn append(&self, entry: LedgerEntryDraft) -> Result<LedgerEntry, LedgerError> {
        let guard = self.connection.lock().map_err(|_| LedgerError::Storage("ledger mutex poisoned".to_string()))?;
        let timestamp_iso = saw_core::time::now_iso();
        let decision_str = entry.decision.map(|d| d.as_str().to_string()).unwrap_or_default();
        let error_str = entry.error.clone().unwrap_or_default();

        let prev_hash: String = guard
            .query_row(
                "SELECT event_hash FROM execution_log WHERE run_id = ?1 ORDER BY timestamp_iso DESC, id DESC LIMIT 1",
                params![entry.run_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| LedgerError::Storage(err.to_string()))?
            .filter(|hash: &String| !hash.is_empty())
            .unwrap_or_else(|| GENESIS.to_string());

        let payload = canonical_event_payload(
            entry.run_id.as_str(),
            &entry.node_id,
            &entry.tool_name,
            &decision_str,
            entry.latency_ms,
            &error_str,
            &timestamp_iso,
        );
        let event_hash =
            chained_hash(&prev_hash, &payload).map_err(|err| LedgerError::Canonicalization(err.to_string()))?;

        guard
            .execute(
                "INSERT INTO execution_log
                    (timestamp_iso, run_id, saw_id, node_id, tool_name, decision, latency_ms, prev_hash, event_hash, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    timestamp_iso,
                    entry.run_id.as_str(),
                    entry.saw_id,
                    entry.node_id,
                    entry.tool_name,
                    decision_str,
                    entry.latency_ms,
                    prev_hash,
                    event_hash,
                    entry.error,
                ],
            )
            .map_err(|err| LedgerError::Storage(err.to_string()))?;

        let id = guard.last_insert_rowid();
        Ok(LedgerEntry {
            id,
            timestamp_iso,
            run_id: entry.run_id,
            saw_id: entry.saw_id,
            node_id: entry.node_id,
            tool_name: entry.tool_name,
            decision: decision_str,
            latency_ms: entry.latency_ms,
            prev_hash,
            event_hash,
            error: entry.error,
        })
    }

    fn entries(&self, run_id: &RunId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let guard = self.connection.lock().map_err(|_| LedgerError::Storage("ledger mutex poisoned".to_string()))?;
        let mut stmt = guard
            .prepare(
                "SELECT id, timestamp_iso, run_id, saw_id, node_id, tool_name, decision, latency_ms, prev_hash, event_hash, error
                 FROM execution_log WHERE run_id = ?1 ORDER BY timestamp_iso, id",
            )
            .map_err(|err| LedgerError::Storage(err.to_string()))?;
        let rows = stmt
            .query_map(params![run_id.as_str()], |row| {
                Ok(LedgerEntry {
                    id: row.get(0)?,
                    timestamp_iso: row.get(1)?,
                    run_id: RunId::new(row.get::<_, String>(2)?),
                    saw_id: row.get(3)?,
                    node_id: row.get(4)?,
                    tool_name: row.get(5)?,
                    decision: row.get(6)?,
                    latency_ms: row.get(7)?,
                    prev_hash: row.get(8)?,
                    event_hash: row.get(9)?,
                    error: row.get(10)?,
                })
            })
            .map_err(|err| LedgerError::Storage(err.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| LedgerError::Storage(err.to_string()))?;
        Ok(rows)
    }

    fn verify(&self, run_id: &RunId) -> Result<IntegrityReport, LedgerError> {
        let rows = self.entries(run_id)?;
        if rows.is_empty() {
            return Ok(IntegrityReport { valid: true, first_mismatch_index: None, expected_hash: None, found_hash: None });
        }

        let mut prev = GENESIS.to_string();
        for (idx, row) in rows.iter().enumerate() {
            let payload = canonical_event_payload(
                row.run_id.as_str(),
                &row.node_id,
                &row.tool_name,
                &row.decision,
                row.latency_ms,
                row.error.as_deref().unwrap_or(""),
                &row.timestamp_iso,
            );
            let expected =
                chained_hash(&prev, &payload).map_err(|err| LedgerError::Canonicalization(err.to_string()))?;

            if row.prev_hash != prev || row.event_hash != expected {
                return Ok(IntegrityReport {
                    valid: false,
                    first_mismatch_index: Some(idx),
                    expected_hash: Some(expected),
                    found_hash: Some(row.event_hash.clone()),
                });
            }
            prev.clone_from(&row.event_hash);
        }

        Ok(IntegrityReport { valid: true, first_mismatch_index: None, expected_hash: None, found_hash: None })
    }
}
