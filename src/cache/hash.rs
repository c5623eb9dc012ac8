//! Content hashing for cache keys.

use super::CacheError;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

/// Hash the logical value of `key`.
///
/// The value is serialized to JSON with object keys sorted at every depth,
/// so two structurally equal values hash the same regardless of map
/// insertion order. Array order is significant.
pub fn create_hash<T: Serialize + ?Sized>(key: &T) -> Result<String, CacheError> {
    let value = serde_json::to_value(key)?;
    let canonical = serde_json::to_string(&canonicalize(value))?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn canonicalize(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            JsonValue::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
