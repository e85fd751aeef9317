//! String store: byte-keyed ordered map of single values.
//!
//! Keys are ordered byte-lexicographically. Prefix iteration is not exposed;
//! the ordered keying exists for memory density and deterministic `keys()`
//! output.

use crate::expiry::ExpiryMap;
use crate::Store;
use ember_core::DataType;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Ordered `bytes → string` store, one value per key.
#[derive(Debug, Default)]
pub struct StrStore {
    inner: RwLock<BTreeMap<Vec<u8>, String>>,
}

impl StrStore {
    /// Create an empty string store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for a key.
    pub fn insert(&self, key: &[u8], value: String) {
        self.inner.write().insert(key.to_vec(), value);
    }

    /// Value for a key, if present.
    pub fn get(&self, key: &[u8]) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    /// Whether the key is present.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Remove a key. Returns whether it was present.
    pub fn remove(&self, key: &[u8]) -> bool {
        self.inner.write().remove(key).is_some()
    }

    /// All keys in byte-lexicographic order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.inner.read().keys().cloned().collect()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Store for StrStore {
    fn data_type(&self) -> DataType {
        DataType::String
    }

    fn evict(&self, expiry: &ExpiryMap) {
        let mut guard = self.inner.write();
        let expired: Vec<Vec<u8>> = guard
            .keys()
            .filter(|key| expiry.has_expired(DataType::String, &String::from_utf8_lossy(key)))
            .cloned()
            .collect();

        for key in expired {
            guard.remove(&key);
            expiry.del(DataType::String, &String::from_utf8_lossy(&key));
        }
    }
}
