//! Transfer checksums
//!
//! A checksum is the lowercase hex SHA-256 of a value's canonical JSON:
//! object keys sorted, no insignificant whitespace. Both sides of the wire
//! compute it over the same canonical form, so two collections with the
//! same members in the same order always agree.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Canonical JSON text of a value
///
/// Going through `serde_json::Value` sorts object keys, since its map type
/// is ordered by key.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&value)
}

/// Digest of an already-canonical serialized form
pub fn digest(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    format!("{:x}", hash)
}

/// Checksum of a value
pub fn checksum<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    Ok(digest(canonical_json(value)?.as_bytes()))
}

/// Check a value against an expected checksum
///
/// The expected value may be an `Etag` header in strong (`"abc"`) or weak
/// (`W/"abc"`) form. A value that fails to serialize never verifies.
pub fn verify<T: Serialize + ?Sized>(value: &T, expected: &str) -> bool {
    match checksum(value) {
        Ok(actual) => actual == strip_etag(expected),
        Err(_) => false,
    }
}

/// Strip the weak prefix and surrounding quotes from an `Etag` value
pub fn strip_etag(etag: &str) -> &str {
    let etag = etag.trim();
    let etag = etag
        .strip_prefix("W/")
        .or_else(|| etag.strip_prefix("w/"))
        .unwrap_or(etag);
    etag.strip_prefix('"')
        .and_then(|e| e.strip_suffix('"'))
        .unwrap_or(etag)
}
