// saw-cli/src/error.rs
// ============================================================================
// Module: CLI Error Envelope
// Description: Stable error codes and the JSON envelope printed on failure.
// Purpose: Surface errors the way the core's error taxonomy describes them
//          (`{code, message, node}`), even though the HTTP façade that
//          originally defined that envelope is out of this substrate's
//          scope.
// Dependencies: saw-core, saw-engine, saw-policy, saw-registry, saw-store-sqlite, serde_json
// ============================================================================

use serde::Serialize;
use thiserror::Error;

/// A CLI-surfaced error, carrying one of the taxonomy's stable string codes.
#[derive(Debug, Error, Serialize)]
#[error("{code}: {message}")]
pub struct CliError {
    /// Stable taxonomy code, e.g. `"WAVE_NOT_FOUND"`.
    pub code: &'static str,
    /// Human-readable detail.
    pub message: String,
    /// Node id the error pertains to, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

impl CliError {
    /// Builds a new error under `code`.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), node: None }
    }

    /// Attaches a node id to this error.
    #[must_use]
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }
}

impl From<saw_core::interfaces::RunStoreError> for CliError {
    fn from(err: saw_core::interfaces::RunStoreError) -> Self {
        match err {
            saw_core::interfaces::RunStoreError::NotFound(id) => Self::new("WAVE_NOT_FOUND", format!("no run matches '{id}'")),
            saw_core::interfaces::RunStoreError::AmbiguousPrefix(prefix) => {
                Self::new("AMBIGUOUS_WAVE_PREFIX", format!("prefix '{prefix}' matches more than one run"))
            }
            saw_core::interfaces::RunStoreError::Storage(detail) => Self::new("WAVE_EXECUTION_ERROR", detail),
        }
    }
}

impl From<saw_core::interfaces::LedgerError> for CliError {
    fn from(err: saw_core::interfaces::LedgerError) -> Self {
        Self::new("WAVE_EXECUTION_ERROR", err.to_string())
    }
}

impl From<saw_store_sqlite::SqliteStoreError> for CliError {
    fn from(err: saw_store_sqlite::SqliteStoreError) -> Self {
        Self::new("WAVE_EXECUTION_ERROR", err.to_string())
    }
}

impl From<saw_engine::EngineError> for CliError {
    fn from(err: saw_engine::EngineError) -> Self {
        let code = match err {
            saw_engine::EngineError::UnsupportedBranching(_) | saw_engine::EngineError::StartNodeCount(_) | saw_engine::EngineError::UnknownNodeType(_) => "UNSUPPORTED_GRAPH",
            saw_engine::EngineError::Timeout(_) => "WAVE_TIMEOUT",
            saw_engine::EngineError::Ledger(_) | saw_engine::EngineError::RunStore(_) | saw_engine::EngineError::LlmRecorder(_) | saw_engine::EngineError::Policy(_) | saw_engine::EngineError::Registry(_) => "WAVE_EXECUTION_ERROR",
        };
        Self::new(code, err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::new("BAD_CONTEXT", err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::new("BAD_CONTEXT", err.to_string())
    }
}
