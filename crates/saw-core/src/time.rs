// saw-core/src/time.rs
// ============================================================================
// Module: SAW Timestamps
// Description: RFC 3339 timestamp helper used for ledger and run metadata.
// Dependencies: time
// ============================================================================

//! Timestamps are always UTC and always rendered with the `time` crate's
//! RFC 3339 formatter so that ledger rows sort lexically in the same order
//! as chronologically.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Returns the current instant formatted as an RFC 3339 UTC timestamp.
#[must_use]
pub fn now_iso() -> String {
    format_iso(OffsetDateTime::now_utc())
}

/// Formats a timestamp as RFC 3339, falling back to a fixed sentinel on
/// (unreachable in practice) formatting failure rather than panicking.
#[must_use]
pub fn format_iso(instant: OffsetDateTime) -> String {
    instant
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
