// saw-store-sqlite/src/error.rs
// ============================================================================
// Module: SQLite Store Errors
// Description: The error type shared by schema setup and every store.
// ============================================================================

use thiserror::Error;

/// Errors raised while opening or migrating the backing `SQLite` database.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// The `SQLite` driver reported a failure.
    #[error("sqlite error: {0}")]
    Db(String),
    /// The on-disk schema version is newer than this binary understands.
    #[error("unsupported schema version: {0}")]
    VersionMismatch(i64),
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Db(err.to_string())
    }
}
