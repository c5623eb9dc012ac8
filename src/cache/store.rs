//! Cache backends.

use crate::collection::Collection;
use crate::model::Record;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A memoized payload.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Collection(Arc<Collection>),
    Record(Record),
    Scalar(JsonValue),
}

impl PartialEq for CacheValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CacheValue::Collection(a), CacheValue::Collection(b)) => Arc::ptr_eq(a, b) || a == b,
            (CacheValue::Record(a), CacheValue::Record(b)) => a == b,
            (CacheValue::Scalar(a), CacheValue::Scalar(b)) => a == b,
            _ => false,
        }
    }
}

/// Backend contract. Keys arrive already prefixed and hashed.
///
/// Concurrent `set` calls on the same key are last-write-wins.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheValue>;
    fn set(&self, key: &str, value: CacheValue);
    fn has(&self, key: &str) -> bool;
    fn delete(&self, key: &str) -> bool;
    fn clear(&self);
}

/// Process-local store.
///
/// Entries never expire and are never evicted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CacheValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<CacheValue> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: CacheValue) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
    }

    fn has(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    fn delete(&self, key: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some()
    }

    fn clear(&self) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
