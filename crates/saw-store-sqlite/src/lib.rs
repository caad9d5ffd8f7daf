// saw-store-sqlite/src/lib.rs
// ============================================================================
// Module: SAW SQLite Store Library
// Description: Public API surface for the `SQLite`-backed ledger, run store,
//              and LLM invocation recorder.
// Purpose: The only crate in this workspace that knows about `SQLite`; every
//          other crate depends on the traits in `saw_core::interfaces`.
// ============================================================================

//! ## Overview
//! Every store here shares one `Arc<Mutex<rusqlite::Connection>>`: `SQLite`
//! in `WAL` mode tolerates concurrent readers but only one writer, and a
//! single process-wide connection is the simplest way to honor that.

pub mod error;
pub mod ledger;
pub mod llm_store;
pub mod memory;
pub mod run_store;
pub mod schema;

use std::sync::Arc;
use std::sync::Mutex;

pub use error::SqliteStoreError;
pub use ledger::SqliteLedger;
pub use llm_store::SqliteLlmRecorder;
pub use memory::InMemoryLedger;
pub use run_store::SqliteRunStore;

/// A fully initialized set of stores sharing one connection, opened at
/// `path`. Pass `:memory:` for an ephemeral, process-local database.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the connection cannot be opened or the
/// schema cannot be initialized.
pub fn open(path: &str) -> Result<(SqliteLedger, SqliteRunStore, SqliteLlmRecorder), SqliteStoreError> {
    let connection = schema::open_connection(path)?;
    schema::initialize_schema(&connection)?;
    let connection = Arc::new(Mutex::new(connection));
    Ok((
        SqliteLedger::new(Arc::clone(&connection)),
        SqliteRunStore::new(Arc::clone(&connection)),
        SqliteLlmRecorder::new(connection),
    ))
}
