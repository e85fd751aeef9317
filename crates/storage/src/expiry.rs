//! Shared expiry map: `(data type, key) → deadline`.
//!
//! One logical table partitioned by type tag, consulted by every read path
//! and by the background sweepers. A missing entry means "no TTL". The map
//! is internally synchronized (sharded concurrent map) so stores and
//! sweepers access it without any external lock.

use dashmap::DashMap;
use ember_core::{clock, DataType};

/// Deadline table keyed by `(data type, key)`. Deadlines are unix seconds.
#[derive(Debug, Default)]
pub struct ExpiryMap {
    deadlines: DashMap<(DataType, String), i64>,
}

impl ExpiryMap {
    /// Create an empty expiry map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the deadline for a key.
    pub fn set(&self, data_type: DataType, key: &str, deadline: i64) {
        self.deadlines.insert((data_type, key.to_string()), deadline);
    }

    /// Deadline for a key, if one is set.
    pub fn get(&self, data_type: DataType, key: &str) -> Option<i64> {
        self.deadlines
            .get(&(data_type, key.to_string()))
            .map(|entry| *entry)
    }

    /// Clear the deadline for a key. Clearing a key without a deadline is a
    /// no-op.
    pub fn del(&self, data_type: DataType, key: &str) {
        self.deadlines.remove(&(data_type, key.to_string()));
    }

    /// Whether the key has a deadline that is now in the past.
    ///
    /// A key without a deadline never expires.
    pub fn has_expired(&self, data_type: DataType, key: &str) -> bool {
        match self.get(data_type, key) {
            Some(deadline) => clock::unix_seconds() > deadline,
            None => false,
        }
    }

    /// Number of tracked deadlines across all type partitions.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Whether no deadlines are tracked.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
