//! Set store: `key → set<member>`.
//!
//! Random-selection operations (`srandmember`, `spop`) follow the Redis
//! count convention: a non-negative count yields up to `count` distinct
//! members; a negative count yields `|count|` members with repetition.

use crate::expiry::ExpiryMap;
use crate::Store;
use ember_core::DataType;
use parking_lot::RwLock;
use rand::seq::IteratorRandom;
use std::collections::{HashMap, HashSet};

/// Hash-of-sets store. Keys with no remaining members are dropped.
#[derive(Debug, Default)]
pub struct SetStore {
    inner: RwLock<HashMap<String, HashSet<String>>>,
}

impl SetStore {
    /// Create an empty set store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member. Returns 1 when the member was newly added, 0 when it
    /// was already present.
    pub fn sadd(&self, key: &str, member: &str) -> i64 {
        let mut guard = self.inner.write();
        let added = guard
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        i64::from(added)
    }

    /// Remove a member. Returns whether it was present.
    pub fn srem(&self, key: &str, member: &str) -> bool {
        let mut guard = self.inner.write();
        let Some(members) = guard.get_mut(key) else {
            return false;
        };
        let removed = members.remove(member);
        if members.is_empty() {
            guard.remove(key);
        }
        removed
    }

    /// Whether the member is in the set at key.
    pub fn sismember(&self, key: &str, member: &str) -> bool {
        self.inner
            .read()
            .get(key)
            .is_some_and(|members| members.contains(member))
    }

    /// Random members, Redis count semantics. Arbitrary order.
    pub fn srandmember(&self, key: &str, count: i64) -> Vec<String> {
        let guard = self.inner.read();
        let Some(members) = guard.get(key) else {
            return Vec::new();
        };
        let mut rng = rand::thread_rng();
        if count >= 0 {
            members
                .iter()
                .cloned()
                .choose_multiple(&mut rng, count as usize)
        } else {
            (0..count.unsigned_abs())
                .filter_map(|_| members.iter().choose(&mut rng).cloned())
                .collect()
        }
    }

    /// Remove and return up to `count` random members, without replacement.
    pub fn spop(&self, key: &str, count: usize) -> Vec<String> {
        let mut guard = self.inner.write();
        let Some(members) = guard.get_mut(key) else {
            return Vec::new();
        };
        let mut rng = rand::thread_rng();
        let popped: Vec<String> = members.iter().cloned().choose_multiple(&mut rng, count);
        for member in &popped {
            members.remove(member);
        }
        if members.is_empty() {
            guard.remove(key);
        }
        popped
    }

    /// Move a member from `src` to `dst`. Returns false when `src` does not
    /// contain the member; the move is atomic under the store lock.
    pub fn smove(&self, src: &str, dst: &str, member: &str) -> bool {
        let mut guard = self.inner.write();
        let Some(src_members) = guard.get_mut(src) else {
            return false;
        };
        if !src_members.remove(member) {
            return false;
        }
        if src_members.is_empty() {
            guard.remove(src);
        }
        guard
            .entry(dst.to_string())
            .or_default()
            .insert(member.to_string());
        true
    }

    /// Cardinality of the set at key.
    pub fn scard(&self, key: &str) -> i64 {
        self.inner.read().get(key).map_or(0, |m| m.len() as i64)
    }

    /// All members at key, arbitrary order.
    pub fn smembers(&self, key: &str) -> Vec<String> {
        match self.inner.read().get(key) {
            Some(members) => members.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Distinct members across all listed keys.
    pub fn sunion(&self, keys: &[&str]) -> Vec<String> {
        let guard = self.inner.read();
        let mut union = HashSet::new();
        for key in keys {
            if let Some(members) = guard.get(*key) {
                union.extend(members.iter().cloned());
            }
        }
        union.into_iter().collect()
    }

    /// Members of the first key that appear in none of the rest.
    pub fn sdiff(&self, keys: &[&str]) -> Vec<String> {
        let Some((first, rest)) = keys.split_first() else {
            return Vec::new();
        };
        let guard = self.inner.read();
        let Some(base) = guard.get(*first) else {
            return Vec::new();
        };
        base.iter()
            .filter(|member| {
                !rest
                    .iter()
                    .any(|key| guard.get(*key).is_some_and(|m| m.contains(*member)))
            })
            .cloned()
            .collect()
    }

    /// Whether the key holds any members.
    pub fn key_exists(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Remove the key and every member under it.
    pub fn clear(&self, key: &str) {
        self.inner.write().remove(key);
    }

    /// All set keys.
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }
}

impl Store for SetStore {
    fn data_type(&self) -> DataType {
        DataType::Set
    }

    fn evict(&self, expiry: &ExpiryMap) {
        let mut guard = self.inner.write();
        let expired: Vec<String> = guard
            .keys()
            .filter(|key| expiry.has_expired(DataType::Set, key))
            .cloned()
            .collect();

        for key in expired {
            guard.remove(&key);
            expiry.del(DataType::Set, &key);
        }
    }
}
