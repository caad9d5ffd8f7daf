// saw-core/src/canonical.rs
// ============================================================================
// Module: SAW Canonical JSON
// Description: Deterministic JSON encoding used for ledger and policy hashing.
// Purpose: Guarantee identical bytes for identical logical payloads across
//          implementations of this substrate, matching the reference's
//          `json.dumps(obj, sort_keys=True, separators=(",", ":"))` output.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This is deliberately *not* RFC 8785 (JCS): JCS numbers follow the
//! ECMAScript `Number::toString` algorithm, which renders `1.0` as `1`.
//! The reference implementation hashes Python's `json.dumps`, which always
//! emits a decimal point for `float` values and never for `int` values. A
//! `latency_ms` of exactly `1.0` must canonicalize to `1.0`, not `1`, or the
//! hash chain diverges from every other implementation of this ledger.
//! `serde_jcs` is still used elsewhere (policy snapshots) where no field is
//! ever a float.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while canonicalizing a value to JSON.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// The value could not be serialized to `serde_json::Value` at all.
    #[error("failed to serialize value: {0}")]
    Serialize(String),
}

/// Serializes `value` and renders it as canonical JSON text: object keys
/// sorted ascending, no inter-token whitespace, and floats always carrying
/// at least one digit after the decimal point.
///
/// # Errors
///
/// Returns [`CanonicalError::Serialize`] if `value` cannot be converted to a
/// `serde_json::Value`.
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonicalError> {
    let json = serde_json::to_value(value).map_err(|err| CanonicalError::Serialize(err.to_string()))?;
    let mut out = String::new();
    write_canonical(&json, &mut out);
    Ok(out)
}

/// Same as [`to_canonical_string`] but returns UTF-8 bytes.
///
/// # Errors
///
/// Returns [`CanonicalError::Serialize`] if `value` cannot be converted to a
/// `serde_json::Value`.
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    Ok(to_canonical_string(value)?.into_bytes())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out),
        Value::String(s) => write_json_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => write_object(map, out),
    }
}

fn write_object(map: &Map<String, Value>, out: &mut String) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    out.push('{');
    for (idx, key) in keys.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        write_json_string(key, out);
        out.push(':');
        if let Some(v) = map.get(key.as_str()) {
            write_canonical(v, out);
        }
    }
    out.push('}');
}

fn write_number(n: &serde_json::Number, out: &mut String) {
    if let Some(i) = n.as_i64() {
        let _ = write!(out, "{i}");
        return;
    }
    if let Some(u) = n.as_u64() {
        let _ = write!(out, "{u}");
        return;
    }
    let f = n.as_f64().unwrap_or(0.0);
    write_float(f, out);
}

fn write_float(f: f64, out: &mut String) {
    if f == f.trunc() && f.is_finite() {
        let _ = write!(out, "{f:.1}");
    } else {
        let _ = write!(out, "{f}");
    }
}

fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::to_canonical_string;
    use serde_json::json;

    #[test]
    fn integer_float_renders_with_decimal_point() {
        let value = json!({"latency_ms": 1.0_f64});
        let text = to_canonical_string(&value).unwrap_or_default();
        assert_eq!(text, "{\"latency_ms\":1.0}");
    }

    #[test]
    fn plain_integer_renders_without_decimal_point() {
        let value = json!({"max_tokens": 1024});
        let text = to_canonical_string(&value).unwrap_or_default();
        assert_eq!(text, "{\"max_tokens\":1024}");
    }

    #[test]
    fn object_keys_sort_ascending() {
        let value = json!({"b": 2, "a": 1});
        let text = to_canonical_string(&value).unwrap_or_default();
        assert_eq!(text, "{\"a\":1,\"b\":2}");
    }

    #[test]
    fn no_inter_token_whitespace() {
        let value = json!({"a": [1, 2, 3], "b": "x"});
        let text = to_canonical_string(&value).unwrap_or_default();
        assert!(!text.contains(' '));
    }

    #[test]
    fn non_integral_float_keeps_its_digits() {
        let value = json!({"margin_pct": 19.5_f64});
        let text = to_canonical_string(&value).unwrap_or_default();
        assert_eq!(text, "{\"margin_pct\":19.5}");
    }
}
