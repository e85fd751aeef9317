//! Hash store: `key → (field → value)`.

use crate::expiry::ExpiryMap;
use crate::Store;
use ember_core::DataType;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Map-of-maps store for hash keys.
#[derive(Debug, Default)]
pub struct HashStore {
    inner: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl HashStore {
    /// Create an empty hash store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Returns 1 when the field was newly created, 0 when an
    /// existing field was overwritten.
    pub fn hset(&self, key: &str, field: &str, value: String) -> i64 {
        let mut guard = self.inner.write();
        let entry = guard.entry(key.to_string()).or_default();
        match entry.insert(field.to_string(), value) {
            None => 1,
            Some(_) => 0,
        }
    }

    /// Value of a field, if present.
    pub fn hget(&self, key: &str, field: &str) -> Option<String> {
        self.inner.read().get(key)?.get(field).cloned()
    }

    /// All values stored at key. Order is arbitrary but stable within one
    /// call.
    pub fn hgetall(&self, key: &str) -> Vec<(String, String)> {
        match self.inner.read().get(key) {
            Some(fields) => fields
                .iter()
                .map(|(f, v)| (f.clone(), v.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Delete a field. Returns 1 when the field existed. Removes the key
    /// entirely once its last field is gone.
    pub fn hdel(&self, key: &str, field: &str) -> i64 {
        let mut guard = self.inner.write();
        let Some(fields) = guard.get_mut(key) else {
            return 0;
        };
        let removed = fields.remove(field).is_some();
        if fields.is_empty() {
            guard.remove(key);
        }
        i64::from(removed)
    }

    /// Whether the field exists at key.
    pub fn hexists(&self, key: &str, field: &str) -> bool {
        self.inner
            .read()
            .get(key)
            .is_some_and(|fields| fields.contains_key(field))
    }

    /// Whether the key holds any fields.
    pub fn key_exists(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Number of fields at key.
    pub fn hlen(&self, key: &str) -> i64 {
        self.inner.read().get(key).map_or(0, |f| f.len() as i64)
    }

    /// All field names at key.
    pub fn hkeys(&self, key: &str) -> Vec<String> {
        match self.inner.read().get(key) {
            Some(fields) => fields.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// All values at key.
    pub fn hvals(&self, key: &str) -> Vec<String> {
        match self.inner.read().get(key) {
            Some(fields) => fields.values().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Remove the key and every field under it.
    pub fn clear(&self, key: &str) {
        self.inner.write().remove(key);
    }

    /// All hash keys.
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }
}

impl Store for HashStore {
    fn data_type(&self) -> DataType {
        DataType::Hash
    }

    fn evict(&self, expiry: &ExpiryMap) {
        let mut guard = self.inner.write();
        let expired: Vec<String> = guard
            .keys()
            .filter(|key| expiry.has_expired(DataType::Hash, key))
            .cloned()
            .collect();

        for key in expired {
            guard.remove(&key);
            expiry.del(DataType::Hash, &key);
        }
    }
}
