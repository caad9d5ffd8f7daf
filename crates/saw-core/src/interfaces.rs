// saw-core/src/interfaces.rs
// ============================================================================
// Module: SAW Interfaces
// Description: Backend-agnostic interfaces for the ledger, run metadata
//              store, and LLM invocation recorder.
// Purpose: Let the engine depend on storage capability without depending on
//          any concrete storage crate.
// Dependencies: crate::model
// ============================================================================

//! ## Overview
//! Implementations must be deterministic and fail closed: a storage error
//! surfaces as a fatal condition for the calling engine step rather than
//! letting the run proceed without a committed audit record.

use serde_json::Value;
use thiserror::Error;

use crate::identifiers::RunId;
use crate::model::Decision;

/// One row to be appended to the ledger for a single node visit.
#[derive(Debug, Clone)]
pub struct LedgerEntryDraft {
    /// Run this entry belongs to.
    pub run_id: RunId,
    /// SAW identifier, denormalized for query convenience.
    pub saw_id: String,
    /// Node this entry records.
    pub node_id: String,
    /// Tool name, empty for start/end/approval nodes.
    pub tool_name: String,
    /// Allow/deny outcome, or `None` for start/end nodes which carry no
    /// meaningful decision.
    pub decision: Option<Decision>,
    /// Measured latency or approval wait time, in milliseconds.
    pub latency_ms: f64,
    /// Error message, if any.
    pub error: Option<String>,
}

/// A committed ledger row, as read back from storage.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    /// Storage-assigned monotonic id.
    pub id: i64,
    /// RFC 3339 timestamp this entry was written at.
    pub timestamp_iso: String,
    /// Run this entry belongs to.
    pub run_id: RunId,
    /// SAW identifier.
    pub saw_id: String,
    /// Node this entry records.
    pub node_id: String,
    /// Tool name, empty for start/end/approval nodes.
    pub tool_name: String,
    /// Wire-form decision: `"allow"`, `"deny"`, or `""`.
    pub decision: String,
    /// Measured latency or approval wait time, in milliseconds.
    pub latency_ms: f64,
    /// The previous entry's `event_hash` in this run's chain, or
    /// `"GENESIS"` for the first entry.
    pub prev_hash: String,
    /// `SHA-256(prev_hash ∥ canonical_json(payload))`.
    pub event_hash: String,
    /// Error message, if any.
    pub error: Option<String>,
}

/// Outcome of re-walking a run's hash chain from `GENESIS`.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    /// Whether the chain matches the recomputed hashes row-for-row.
    pub valid: bool,
    /// Zero-based index of the first mismatching row, when invalid.
    pub first_mismatch_index: Option<usize>,
    /// The recomputed hash at the first mismatch, when invalid.
    pub expected_hash: Option<String>,
    /// The stored hash at the first mismatch, when invalid.
    pub found_hash: Option<String>,
}

/// Errors raised by a [`Ledger`] implementation.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The underlying store reported an I/O or driver error.
    #[error("ledger storage error: {0}")]
    Storage(String),
    /// The entry could not be canonicalized for hashing.
    #[error("ledger canonicalization error: {0}")]
    Canonicalization(String),
}

/// Append-only, hash-chained event log, one chain per `run_id`.
pub trait Ledger {
    /// Appends `entry`, computing its `prev_hash`/`event_hash` from the
    /// latest entry for `entry.run_id` (or `"GENESIS"` if none exists).
    ///
    /// The read-latest-then-insert sequence must be atomic per `run_id`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the write fails.
    fn append(&self, entry: LedgerEntryDraft) -> Result<LedgerEntry, LedgerError>;

    /// Returns all entries for `run_id`, ordered ascending by
    /// `(timestamp_iso, id)`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the read fails.
    fn entries(&self, run_id: &RunId) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Re-walks `run_id`'s chain from `GENESIS` and reports the first
    /// mismatch, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the read fails.
    fn verify(&self, run_id: &RunId) -> Result<IntegrityReport, LedgerError>;
}

/// Run metadata recorded when a run is opened, updated, and closed.
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// Run identifier.
    pub run_id: RunId,
    /// SAW identifier.
    pub saw_id: String,
    /// RFC 3339 timestamp the run started at.
    pub started_at: String,
    /// Current status: `"running"`, `"completed"`, `"denied"`, or `"error"`.
    pub status: String,
    /// SHA-256 over the canonical JSON of the policy snapshot.
    pub policy_hash: String,
    /// Policy identifier, denormalized for query convenience.
    pub policy_version: String,
    /// Canonical JSON of the policy bundle this run was opened under.
    pub policy_snapshot: String,
    /// Attribution of the approver, once an approval gate has been crossed.
    pub approved_by: Option<String>,
    /// RFC 3339 timestamp of approval, once crossed.
    pub approved_at: Option<String>,
    /// Free-form approval note, once crossed.
    pub approval_note: Option<String>,
}

/// Errors raised by a [`RunStore`] implementation.
#[derive(Debug, Error)]
pub enum RunStoreError {
    /// The underlying store reported an I/O or driver error.
    #[error("run store error: {0}")]
    Storage(String),
    /// No run exists under the given identifier (or prefix).
    #[error("run '{0}' not found")]
    NotFound(String),
    /// A short-identifier prefix matched more than one run.
    #[error("run id prefix '{0}' is ambiguous")]
    AmbiguousPrefix(String),
}

/// Idempotent store for per-run metadata.
pub trait RunStore {
    /// Opens (or re-opens) a run record. Upserts on `run_id`: re-running
    /// with the same id overwrites the header but never the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError`] when the write fails.
    fn upsert_start(&self, record: &RunRecord) -> Result<(), RunStoreError>;

    /// Updates the terminal (or in-flight) status of a run.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError`] when the write fails.
    fn update_status(&self, run_id: &RunId, status: &str) -> Result<(), RunStoreError>;

    /// Records approval attribution on a run.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError`] when the write fails.
    fn update_approval(&self, run_id: &RunId, approved_by: Option<&str>, approved_at: Option<&str>, approval_note: Option<&str>) -> Result<(), RunStoreError>;

    /// Loads a run record by id.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError::NotFound`] when no such run exists, or
    /// [`RunStoreError::Storage`] when the read fails.
    fn load(&self, run_id: &RunId) -> Result<RunRecord, RunStoreError>;

    /// Resolves a short, human-typed `prefix` to the one full [`RunId`] it
    /// unambiguously identifies. This is a surface-level convenience for
    /// user-facing lookups only; the engine itself always operates on full
    /// identifiers and never accepts a prefix.
    ///
    /// # Errors
    ///
    /// Returns [`RunStoreError::NotFound`] when no run id starts with
    /// `prefix`, or [`RunStoreError::AmbiguousPrefix`] when more than one
    /// does.
    fn resolve_prefix(&self, prefix: &str) -> Result<RunId, RunStoreError>;
}

/// Errors raised by an [`LlmInvocationRecorder`] implementation.
#[derive(Debug, Error)]
pub enum LlmRecorderError {
    /// The underlying store reported an I/O or driver error.
    #[error("llm invocation recorder error: {0}")]
    Storage(String),
}

/// Input to [`LlmInvocationRecorder::record`].
#[derive(Debug, Clone)]
pub struct LlmInvocationDraft {
    /// Run this invocation belongs to.
    pub run_id: RunId,
    /// Node this invocation was made from.
    pub node_id: String,
    /// RFC 3339 timestamp the invocation was made at.
    pub invoked_at: String,
    /// Upstream provider name.
    pub provider: Option<String>,
    /// Model name.
    pub model_name: Option<String>,
    /// Model version.
    pub model_version: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Max tokens requested.
    pub max_tokens: Option<i64>,
    /// Raw tool input handed to the model.
    pub raw_tool_input: Value,
    /// Sanitized prompt input.
    pub sanitized_prompt_input: Value,
    /// Raw output text from the model.
    pub llm_output_text: String,
}

/// Records a hashed, preview-truncated record of every non-deterministic
/// tool invocation.
pub trait LlmInvocationRecorder {
    /// Commits one invocation record.
    ///
    /// # Errors
    ///
    /// Returns [`LlmRecorderError`] when the write fails.
    fn record(&self, draft: LlmInvocationDraft) -> Result<(), LlmRecorderError>;
}
