// saw-core/src/hashing.rs
// ============================================================================
// Module: SAW Content Hashing
// Description: SHA-256 digests over canonical JSON and normalized text.
// Purpose: Provide the primitives the ledger and LLM invocation recorder
//          build their hash chains and integrity hashes from.
// Dependencies: serde, sha2
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::canonical::CanonicalError;
use crate::canonical::to_canonical_bytes;

/// Hex-encodes `bytes` in lowercase.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Returns the lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

/// Returns the SHA-256 digest of `prefix` concatenated with `value`'s
/// canonical JSON encoding. This is the ledger's `event_hash` primitive:
/// `SHA-256(prev_hash ∥ canonical_json(payload))`.
///
/// # Errors
///
/// Returns [`CanonicalError`] if `value` cannot be canonicalized.
pub fn chained_hash<T: Serialize + ?Sized>(prefix: &str, value: &T) -> Result<String, CanonicalError> {
    let canonical = to_canonical_bytes(value)?;
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(&canonical);
    Ok(hex_encode(&hasher.finalize()))
}

/// Normalizes text the way the LLM invocation recorder hashes it: CRLF is
/// collapsed to LF and trailing whitespace is trimmed.
#[must_use]
pub fn normalize_text(value: &str) -> String {
    value.replace("\r\n", "\n").trim_end().to_string()
}

/// Returns the SHA-256 digest of `value` after [`normalize_text`].
#[must_use]
pub fn normalized_payload_hash(value: &str) -> String {
    sha256_hex(normalize_text(value).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::chained_hash;
    use super::normalize_text;
    use super::normalized_payload_hash;
    use serde_json::json;

    #[test]
    fn chained_hash_is_deterministic() {
        let payload = json!({"a": 1, "latency_ms": 2.0});
        let first = chained_hash("GENESIS", &payload).unwrap_or_default();
        let second = chained_hash("GENESIS", &payload).unwrap_or_default();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn different_prefix_changes_hash() {
        let payload = json!({"a": 1});
        let a = chained_hash("GENESIS", &payload).unwrap_or_default();
        let b = chained_hash("not-genesis", &payload).unwrap_or_default();
        assert_ne!(a, b);
    }

    #[test]
    fn normalize_text_collapses_crlf_and_trims_trailing_whitespace() {
        assert_eq!(normalize_text("line one\r\nline two\r\n  "), "line one\nline two");
    }

    #[test]
    fn normalized_payload_hash_ignores_trailing_whitespace_differences() {
        let a = normalized_payload_hash("hello world");
        let b = normalized_payload_hash("hello world   \r\n");
        assert_eq!(a, b);
    }
}
