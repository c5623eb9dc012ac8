//! Cache error types

use std::fmt;

/// Store kinds accepted by [`CacheStoreKind`](super::CacheStoreKind).
pub const VALID_STORES: &[&str] = &["memory", "redis"];

#[derive(Debug)]
pub enum CacheError {
    /// An unsupported backend kind was configured.
    InvalidStore(String),
    /// A cache key could not be serialized for hashing.
    Serialization(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::InvalidStore(kind) => write!(
                f,
                "{kind} is not a valid cache store. Valid cache stores are {}.",
                VALID_STORES.join(", ")
            ),
            CacheError::Serialization(msg) => write!(f, "Cache key serialization error: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_store_lists_valid_stores() {
        let err = CacheError::InvalidStore("memcached".to_string());
        let message = err.to_string();
        assert!(message.starts_with("memcached is not a valid cache store"));
        assert!(message.contains("memory, redis"));
    }
}
