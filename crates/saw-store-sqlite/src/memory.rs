// saw-store-sqlite/src/memory.rs
// ============================================================================
// Module: In-Memory Ledger
// Description: A `Mutex<Vec<_>>`-backed `Ledger` used in engine tests that
//              want chain semantics without opening a database file.
// Purpose: Give `saw-engine` (and other crates) a dependency-free `Ledger`
//          for unit tests, matching the hash-chain rules of `SqliteLedger`
//          exactly.
// Dependencies: saw-core
// ============================================================================

use std::sync::Mutex;

use saw_core::hashing::chained_hash;
use saw_core::identifiers::RunId;
use saw_core::interfaces::IntegrityReport;
use saw_core::interfaces::Ledger;
use saw_core::interfaces::LedgerEntry;
use saw_core::interfaces::LedgerEntryDraft;
use saw_core::interfaces::LedgerError;
use serde_json::json;

use crate::ledger::GENESIS;

/// An append-only `Ledger` kept entirely in process memory.
#[derive(Default)]
pub struct InMemoryLedger {
    rows: Mutex<Vec<LedgerEntry>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for InMemoryLedger {
    fn append(&self, entry: LedgerEntryDraft) -> Result<LedgerEntry, LedgerError> {
        let mut rows = self.rows.lock().map_err(|_| LedgerError::Storage("in-memory ledger mutex poisoned".to_string()))?;
        let timestamp_iso = saw_core::time::now_iso();
        let decision_str = entry.decision.map(|d| d.as_str().to_string()).unwrap_or_default();
        let error_str = entry.error.clone().unwrap_or_default();

        let prev_hash = rows
            .iter()
            .filter(|row| row.run_id == entry.run_id)
            .next_back()
            .map_or_else(|| GENESIS.to_string(), |row| row.event_hash.clone());

        let payload = json!({
            "run_id": entry.run_id.as_str(),
            "node_id": entry.node_id,
            "tool_name": entry.tool_name,
            "decision": decision_str,
            "latency_ms": entry.latency_ms,
            "error": error_str,
            "timestamp": timestamp_iso,
        });
        let event_hash =
            chained_hash(&prev_hash, &payload).map_err(|err| LedgerError::Canonicalization(err.to_string()))?;

        let row = LedgerEntry {
            id: i64::try_from(rows.len()).unwrap_or(i64::MAX) + 1,
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
        };
        rows.push(row.clone());
        Ok(row)
    }

    fn entries(&self, run_id: &RunId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let rows = self.rows.lock().map_err(|_| LedgerError::Storage("in-memory ledger mutex poisoned".to_string()))?;
        Ok(rows.iter().filter(|row| &row.run_id == run_id).cloned().collect())
    }

    fn verify(&self, run_id: &RunId) -> Result<IntegrityReport, LedgerError> {
        let rows = self.entries(run_id)?;
        if rows.is_empty() {
            return Ok(IntegrityReport { valid: true, first_mismatch_index: None, expected_hash: None, found_hash: None });
        }

        let mut prev = GENESIS.to_string();
        for (idx, row) in rows.iter().enumerate() {
            let payload = json!({
                "run_id": row.run_id.as_str(),
                "node_id": row.node_id,
                "tool_name": row.tool_name,
                "decision": row.decision,
                "latency_ms": row.latency_ms,
                "error": row.error.clone().unwrap_or_default(),
                "timestamp": row.timestamp_iso,
            });
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

#[cfg(test)]
mod tests {
    use super::InMemoryLedger;
    use saw_core::RunId;
    use saw_core::interfaces::Ledger;
    use saw_core::interfaces::LedgerEntryDraft;

    fn draft(run_id: &str, node_id: &str) -> LedgerEntryDraft {
        LedgerEntryDraft {
            run_id: RunId::new(run_id),
            saw_id: "saw_board_metrics_v1".to_string(),
            node_id: node_id.to_string(),
            tool_name: String::new(),
            decision: None,
            latency_ms: 5.0,
            error: None,
        }
    }

    #[test]
    fn chain_matches_sqlite_ledger_semantics() {
        let ledger = InMemoryLedger::new();
        let first = ledger.append(draft("r1", "n_start"));
        let second = ledger.append(draft("r1", "n_end"));
        assert!(first.is_ok());
        assert!(second.is_ok());
        if let (Ok(first), Ok(second)) = (first, second) {
            assert_eq!(first.prev_hash, "GENESIS");
            assert_eq!(second.prev_hash, first.event_hash);
        }
    }

    #[test]
    fn tampering_with_a_row_is_detected_on_verify() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.append(draft("r1", "n_start")).is_ok());
        assert!(ledger.append(draft("r1", "n_tool")).is_ok());
        assert!(ledger.append(draft("r1", "n_end")).is_ok());
        {
            let mut rows = ledger.rows.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(row) = rows.get_mut(1) {
                row.tool_name = "tampered".to_string();
            }
        }
        let report = ledger.verify(&RunId::new("r1"));
        assert!(report.is_ok());
        if let Ok(report) = report {
            assert!(!report.valid);
            assert_eq!(report.first_mismatch_index, Some(1));
        }
    }
}
