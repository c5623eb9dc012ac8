//! Content-addressable memoization of query results.
//!
//! Every logical key, typically a query [`Snapshot`](crate::Snapshot), is
//! reduced to `"{prefix}::{sha256 of its canonical JSON}"` before it reaches
//! the store. Two structurally equal snapshots therefore share one entry.
//!
//! The cache is not transactional. Two identical queries racing on a miss
//! both compute and both write; the later write wins. Results are memoized at
//! most once per write, never computed exactly once.

pub mod error;
pub mod hash;
pub mod store;

pub use error::{CacheError, VALID_STORES};
pub use hash::create_hash;
pub use store::{CacheStore, CacheValue, MemoryStore};

use crate::config::CacheConfig;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;

/// Configured backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStoreKind {
    Memory,
    /// Accepted for configuration compatibility; served by [`MemoryStore`].
    Redis,
}

impl FromStr for CacheStoreKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(CacheStoreKind::Memory),
            "redis" => Ok(CacheStoreKind::Redis),
            other => Err(CacheError::InvalidStore(other.to_string())),
        }
    }
}

/// Prefixing, hashing front end over a [`CacheStore`].
#[derive(Clone)]
pub struct Cache {
    prefix: String,
    store: Arc<dyn CacheStore>,
}

impl Cache {
    /// Build the cache described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidStore` for an unknown store kind.
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let kind: CacheStoreKind = config.store.parse()?;
        if kind == CacheStoreKind::Redis {
            log::warn!("redis cache store is not bundled, using the memory store");
        }
        Ok(Self::with_store(config.prefix.clone(), Arc::new(MemoryStore::new())))
    }

    /// Use a custom backend.
    pub fn with_store(prefix: impl Into<String>, store: Arc<dyn CacheStore>) -> Self {
        Self {
            prefix: prefix.into(),
            store,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Derive the effective store key for a logical key.
    pub fn key_for<K: Serialize + ?Sized>(&self, key: &K) -> Result<String, CacheError> {
        Ok(self.key_from_hash(&create_hash(key)?))
    }

    pub(crate) fn key_from_hash(&self, hash: &str) -> String {
        format!("{}::{}", self.prefix, hash)
    }

    pub fn get<K: Serialize + ?Sized>(&self, key: &K) -> Result<Option<CacheValue>, CacheError> {
        Ok(self.lookup(&self.key_for(key)?))
    }

    pub fn set<K: Serialize + ?Sized>(&self, key: &K, value: CacheValue) -> Result<(), CacheError> {
        self.put(&self.key_for(key)?, value);
        Ok(())
    }

    pub fn has<K: Serialize + ?Sized>(&self, key: &K) -> Result<bool, CacheError> {
        Ok(self.store.has(&self.key_for(key)?))
    }

    pub fn delete<K: Serialize + ?Sized>(&self, key: &K) -> Result<bool, CacheError> {
        Ok(self.store.delete(&self.key_for(key)?))
    }

    /// Drop every entry in the backing store.
    pub fn clear(&self) {
        self.store.clear();
    }

    pub(crate) fn lookup(&self, key: &str) -> Option<CacheValue> {
        let hit = self.store.get(key);
        match hit {
            Some(_) => {
                log::trace!("cache hit {key}");
                #[cfg(feature = "metrics")]
                METRICS.record_cache_hit();
            }
            None => {
                log::trace!("cache miss {key}");
                #[cfg(feature = "metrics")]
                METRICS.record_cache_miss();
            }
        }
        hit
    }

    pub(crate) fn put(&self, key: &str, value: CacheValue) {
        self.store.set(key, value);
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
