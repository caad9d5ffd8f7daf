// saw-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Schema
// Description: Connection setup, pragmas, and schema (plus backward
//              compatible column migration) for the ledger, run, and LLM
//              invocation tables.
// Purpose: One place owns `CREATE TABLE IF NOT EXISTS` and the legacy-column
//          backfill, so every store opens against the same guaranteed shape.
// ============================================================================

use rusqlite::Connection;
use rusqlite::OpenFlags;

use crate::error::SqliteStoreError;

/// Busy timeout applied to every connection this crate opens.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS execution_log (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp_iso   TEXT    NOT NULL,
    run_id          TEXT    NOT NULL,
    saw_id          TEXT    NOT NULL,
    node_id         TEXT    NOT NULL,
    tool_name       TEXT    NOT NULL DEFAULT '',
    decision        TEXT    NOT NULL CHECK(decision IN ('allow', 'deny', '')),
    latency_ms      REAL    NOT NULL DEFAULT 0.0,
    prev_hash       TEXT    NOT NULL DEFAULT 'GENESIS',
    event_hash      TEXT    NOT NULL DEFAULT '',
    error           TEXT
);

CREATE INDEX IF NOT EXISTS idx_execution_log_run_id ON execution_log(run_id);
CREATE INDEX IF NOT EXISTS idx_execution_log_saw_id ON execution_log(saw_id);

CREATE TABLE IF NOT EXISTS runs (
    run_id           TEXT PRIMARY KEY,
    saw_id           TEXT NOT NULL,
    started_at       TEXT NOT NULL,
    status           TEXT NOT NULL,
    policy_hash      TEXT,
    policy_version   TEXT,
    policy_snapshot  TEXT,
    approved_by      TEXT,
    approved_at      TEXT,
    approval_note    TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs(started_at);
CREATE INDEX IF NOT EXISTS idx_runs_saw_id ON runs(saw_id);

CREATE TABLE IF NOT EXISTS llm_invocations (
    id                           INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id                       TEXT    NOT NULL,
    node_id                      TEXT    NOT NULL,
    invoked_at                   TEXT    NOT NULL,
    provider                     TEXT,
    model_name                   TEXT,
    model_version                TEXT,
    temperature                  REAL,
    max_tokens                   INTEGER,
    raw_tool_input_hash          TEXT,
    sanitized_prompt_input_hash  TEXT,
    llm_output_text_hash         TEXT,
    raw_tool_input_preview       TEXT,
    llm_output_preview           TEXT
);

CREATE INDEX IF NOT EXISTS idx_llm_invocations_run_id ON llm_invocations(run_id);
CREATE INDEX IF NOT EXISTS idx_llm_invocations_node_id ON llm_invocations(node_id);
CREATE INDEX IF NOT EXISTS idx_llm_invocations_invoked_at ON llm_invocations(invoked_at);
";

/// Opens an `SQLite` connection with the durability pragmas this crate
/// requires, creating the database file if it does not exist.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the driver cannot open the file or the
/// pragmas cannot be applied.
pub fn open_connection(path: &str) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(path, flags)?;
    apply_pragmas(&connection)?;
    Ok(connection)
}

/// Applies the `WAL` journal mode, `NORMAL` synchronous mode, and busy
/// timeout this crate relies on for safe concurrent access from a single
/// process.
fn apply_pragmas(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
    connection.busy_timeout(std::time::Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Creates the schema if absent and backfills columns added after a
/// database's first release, so a store opened against an older file keeps
/// working.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when any statement fails.
pub fn initialize_schema(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection.execute_batch(SCHEMA_SQL)?;
    ensure_runs_columns(connection)?;
    ensure_execution_log_columns(connection)?;
    Ok(())
}

fn table_columns(connection: &Connection, table: &str) -> Result<Vec<String>, SqliteStoreError> {
    let mut stmt = connection.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn ensure_runs_columns(connection: &Connection) -> Result<(), SqliteStoreError> {
    let existing = table_columns(connection, "runs")?;
    let required: &[(&str, &str)] = &[
        ("policy_hash", "TEXT"),
        ("policy_version", "TEXT"),
        ("policy_snapshot", "TEXT"),
        ("approved_by", "TEXT"),
        ("approved_at", "TEXT"),
        ("approval_note", "TEXT"),
    ];
    for (column, sql_type) in required {
        if !existing.iter().any(|c| c == column) {
            connection.execute_batch(&format!("ALTER TABLE runs ADD COLUMN {column} {sql_type}"))?;
        }
    }
    Ok(())
}

fn ensure_execution_log_columns(connection: &Connection) -> Result<(), SqliteStoreError> {
    let existing = table_columns(connection, "execution_log")?;
    let required: &[(&str, &str)] = &[
        ("prev_hash", "TEXT NOT NULL DEFAULT 'GENESIS'"),
        ("event_hash", "TEXT NOT NULL DEFAULT ''"),
    ];
    for (column, sql_type) in required {
        if !existing.iter().any(|c| c == column) {
            connection
                .execute_batch(&format!("ALTER TABLE execution_log ADD COLUMN {column} {sql_type}"))?;
        }
    }
    Ok(())
}
