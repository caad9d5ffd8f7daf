// crates/saw-store-sqlite/tests/ledger_integrity.rs
// ============================================================================
// Module: SQLite Ledger Integrity Tests
// Description: End-to-end append/verify/tamper-detection tests against a
//              real on-disk `SQLite` file.
// Purpose: Exercise the hash chain the way a production ledger would be
//          read back and audited.
// Dependencies: saw-store-sqlite, saw-core, tempfile
// ============================================================================
//! ## Overview
//! Covers append ordering, full-chain verification, and tamper detection
//! after a row is mutated directly through a second connection.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use saw_core::RunId;
use saw_core::interfaces::Ledger;
use saw_core::interfaces::LedgerEntryDraft;
use saw_core::interfaces::RunRecord;
use saw_core::interfaces::RunStore;
use saw_store_sqlite::open;

fn draft(run_id: &str, node_id: &str, tool_name: &str, latency_ms: f64) -> LedgerEntryDraft {
    LedgerEntryDraft {
        run_id: RunId::new(run_id),
        saw_id: "saw_board_metrics_v1".to_string(),
        node_id: node_id.to_string(),
        tool_name: tool_name.to_string(),
        decision: None,
        latency_ms,
        error: None,
    }
}

#[test]
fn a_freshly_opened_database_verifies_clean_for_an_untouched_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ledger.db");
    let (ledger, _runs, _llm) = open(path.to_str().expect("utf8 path")).expect("open store");

    ledger.append(draft("r1", "n_start", "", 0.0)).expect("append start");
    ledger.append(draft("r1", "n_salesforce_pull", "tool_salesforce_read_pipeline", 120.0)).expect("append tool");
    ledger.append(draft("r1", "n_end", "", 0.0)).expect("append end");

    let report = ledger.verify(&RunId::new("r1")).expect("verify");
    assert!(report.valid);
    assert!(report.first_mismatch_index.is_none());
}

#[test]
fn tampering_a_row_after_the_fact_is_caught_at_the_first_mismatch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ledger.db");
    let path_str = path.to_str().expect("utf8 path").to_string();
    let (ledger, _runs, _llm) = open(&path_str).expect("open store");

    // Five rows: start, four tool nodes. Tamper the fourth (index 3).
    ledger.append(draft("r1", "n_start", "", 0.0)).expect("append");
    ledger.append(draft("r1", "n_a", "tool_a", 10.0)).expect("append");
    ledger.append(draft("r1", "n_b", "tool_b", 20.0)).expect("append");
    ledger.append(draft("r1", "n_c", "tool_c", 30.0)).expect("append");
    ledger.append(draft("r1", "n_end", "", 0.0)).expect("append");

    {
        let tamper_connection = rusqlite::Connection::open(&path_str).expect("reopen for tamper");
        tamper_connection
            .execute(
                "UPDATE execution_log SET tool_name = 'tampered' WHERE run_id = 'r1' AND node_id = 'n_c'",
                [],
            )
            .expect("tamper row");
    }

    let report = ledger.verify(&RunId::new("r1")).expect("verify");
    assert!(!report.valid);
    assert_eq!(report.first_mismatch_index, Some(3));
    assert!(report.expected_hash.is_some());
    assert!(report.found_hash.is_some());
}

#[test]
fn run_store_and_ledger_survive_a_reopen_of_the_same_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ledger.db");
    let path_str = path.to_str().expect("utf8 path").to_string();

    {
        let (ledger, runs, _llm) = open(&path_str).expect("open store");
        ledger.append(draft("r1", "n_start", "", 0.0)).expect("append");
        let record = RunRecord {
            run_id: RunId::new("r1"),
            saw_id: "saw_board_metrics_v1".to_string(),
            started_at: "2025-01-01T00:00:00Z".to_string(),
            status: "running".to_string(),
            policy_hash: "deadbeef".to_string(),
            policy_version: "policy_board_metrics_v1".to_string(),
            policy_snapshot: "{}".to_string(),
            approved_by: None,
            approved_at: None,
            approval_note: None,
        };
        runs.upsert_start(&record).expect("upsert");
    }

    let (ledger, runs, _llm) = open(&path_str).expect("reopen store");
    let entries = ledger.entries(&RunId::new("r1")).expect("entries");
    assert_eq!(entries.len(), 1);
    let loaded = runs.load(&RunId::new("r1")).expect("load");
    assert_eq!(loaded.status, "running");
}
