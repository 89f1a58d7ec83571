//! Content fingerprints.
//!
//! A fingerprint is the lowercase hex SHA-256 of a canonical JSON encoding:
//! object keys sorted at every depth, no insignificant whitespace, arrays
//! kept in order. For records the top-level `_id` is left out, so two records
//! with the same fields hash identically whatever ids they were given.

use crate::document::{ID_FIELD, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex digest identifying a record's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading `len` hex characters (the whole digest if `len` exceeds it).
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fingerprint of a record's fields, excluding the top-level `_id`.
pub fn fingerprint(record: &Record) -> Fingerprint {
    let mut out = Vec::new();
    write_canonical_object(&mut out, record, Some(ID_FIELD));
    digest(&out)
}

/// Fingerprint of an arbitrary JSON value. Nothing is excluded.
pub fn fingerprint_value(value: &Value) -> Fingerprint {
    let mut out = Vec::new();
    write_canonical(&mut out, value);
    digest(&out)
}

fn digest(bytes: &[u8]) -> Fingerprint {
    let hash = Sha256::digest(bytes);
    Fingerprint(hex_lower(&hash))
}

fn write_canonical(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_canonical(out, item);
            }
            out.push(b']');
        }
        Value::Object(map) => write_canonical_object(out, map, None),
    }
}

fn write_canonical_object(out: &mut Vec<u8>, map: &Map<String, Value>, skip: Option<&str>) {
    let mut keys: Vec<&String> = map
        .keys()
        .filter(|key| Some(key.as_str()) != skip)
        .collect();
    keys.sort();

    out.push(b'{');
    for (idx, key) in keys.iter().enumerate() {
        if idx > 0 {
            out.push(b',');
        }
        write_string(out, key);
        out.push(b':');
        if let Some(value) = map.get(key.as_str()) {
            write_canonical(out, value);
        }
    }
    out.push(b'}');
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    let encoded = serde_json::to_vec(s).expect("string serialization should not fail");
    out.extend(encoded);
}

fn hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
