//! Sorted-set store: `key → sorted-map<member, score>`.
//!
//! Each sorted set pairs a member → score map with an ordered index of
//! `(score, member)` pairs. Ordering is ascending by score with ties broken
//! by member byte order, so ranks and ranges are deterministic even when
//! scores collide.

use crate::expiry::ExpiryMap;
use crate::Store;
use ember_core::DataType;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;

/// Total-ordered wrapper so f64 scores can key a BTreeSet.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScoreKey(f64);

impl Eq for ScoreKey {}

impl Ord for ScoreKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for ScoreKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One sorted set: member scores plus the (score, member) order index.
#[derive(Debug, Default)]
struct SortedSet {
    scores: HashMap<String, f64>,
    ordered: BTreeSet<(ScoreKey, String)>,
}

impl SortedSet {
    fn insert(&mut self, member: &str, score: f64) {
        if let Some(old) = self.scores.insert(member.to_string(), score) {
            self.ordered.remove(&(ScoreKey(old), member.to_string()));
        }
        self.ordered.insert((ScoreKey(score), member.to_string()));
    }

    fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.ordered.remove(&(ScoreKey(score), member.to_string()));
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.scores.len()
    }

    fn rank(&self, member: &str) -> Option<usize> {
        let score = *self.scores.get(member)?;
        let position = self
            .ordered
            .range((
                Bound::Unbounded,
                Bound::Excluded((ScoreKey(score), member.to_string())),
            ))
            .count();
        Some(position)
    }
}

/// Resolve a Redis-style inclusive `[start, stop]` window over `len`
/// elements. Negative indices count from the end; out-of-range bounds are
/// clamped. Returns `None` when the window is empty.
fn clamp_window(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let n = len as i64;
    let mut lo = if start < 0 { n + start } else { start };
    let mut hi = if stop < 0 { n + stop } else { stop };
    lo = lo.max(0);
    hi = hi.min(n - 1);
    if lo > hi || lo >= n {
        return None;
    }
    Some((lo as usize, hi as usize))
}

/// Hash-of-sorted-sets store.
#[derive(Debug, Default)]
pub struct ZSetStore {
    inner: RwLock<HashMap<String, SortedSet>>,
}

impl ZSetStore {
    /// Create an empty sorted-set store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a member or replace its score (upsert semantics).
    pub fn zadd(&self, key: &str, score: f64, member: &str) {
        self.inner
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(member, score);
    }

    /// Remove a member. Returns whether it was present. Drops the key when
    /// its last member goes.
    pub fn zrem(&self, key: &str, member: &str) -> bool {
        let mut guard = self.inner.write();
        let Some(zset) = guard.get_mut(key) else {
            return false;
        };
        let removed = zset.remove(member);
        if zset.len() == 0 {
            guard.remove(key);
        }
        removed
    }

    /// Score of a member, if present.
    pub fn zscore(&self, key: &str, member: &str) -> Option<f64> {
        self.inner.read().get(key)?.scores.get(member).copied()
    }

    /// Cardinality of the sorted set at key.
    pub fn zcard(&self, key: &str) -> i64 {
        self.inner.read().get(key).map_or(0, |z| z.len() as i64)
    }

    /// Ascending 0-based rank, or -1 when the member is absent.
    pub fn zrank(&self, key: &str, member: &str) -> i64 {
        self.inner
            .read()
            .get(key)
            .and_then(|z| z.rank(member))
            .map_or(-1, |r| r as i64)
    }

    /// Descending 0-based rank, or -1 when the member is absent.
    pub fn zrevrank(&self, key: &str, member: &str) -> i64 {
        let guard = self.inner.read();
        let Some(zset) = guard.get(key) else {
            return -1;
        };
        match zset.rank(member) {
            Some(rank) => (zset.len() - 1 - rank) as i64,
            None => -1,
        }
    }

    /// Add `delta` to the member's score (missing members start at zero).
    /// Returns the new score.
    pub fn zincrby(&self, key: &str, delta: f64, member: &str) -> f64 {
        let mut guard = self.inner.write();
        let zset = guard.entry(key.to_string()).or_default();
        let next = zset.scores.get(member).copied().unwrap_or(0.0) + delta;
        zset.insert(member, next);
        next
    }

    /// Members with scores in the inclusive window `[start, stop]`,
    /// ascending. Negative indices count from the end.
    pub fn zrange(&self, key: &str, start: i64, stop: i64) -> Vec<(String, f64)> {
        let guard = self.inner.read();
        let Some(zset) = guard.get(key) else {
            return Vec::new();
        };
        let Some((lo, hi)) = clamp_window(zset.len(), start, stop) else {
            return Vec::new();
        };
        zset.ordered
            .iter()
            .skip(lo)
            .take(hi - lo + 1)
            .map(|(score, member)| (member.clone(), score.0))
            .collect()
    }

    /// Like `zrange` but ordered from highest score to lowest.
    pub fn zrevrange(&self, key: &str, start: i64, stop: i64) -> Vec<(String, f64)> {
        let guard = self.inner.read();
        let Some(zset) = guard.get(key) else {
            return Vec::new();
        };
        let Some((lo, hi)) = clamp_window(zset.len(), start, stop) else {
            return Vec::new();
        };
        zset.ordered
            .iter()
            .rev()
            .skip(lo)
            .take(hi - lo + 1)
            .map(|(score, member)| (member.clone(), score.0))
            .collect()
    }

    /// The member at the given ascending rank, with its score.
    pub fn zget_by_rank(&self, key: &str, rank: i64) -> Option<(String, f64)> {
        let guard = self.inner.read();
        let zset = guard.get(key)?;
        if rank < 0 || rank as usize >= zset.len() {
            return None;
        }
        zset.ordered
            .iter()
            .nth(rank as usize)
            .map(|(score, member)| (member.clone(), score.0))
    }

    /// The member at the given descending rank, with its score.
    pub fn zrev_get_by_rank(&self, key: &str, rank: i64) -> Option<(String, f64)> {
        let guard = self.inner.read();
        let zset = guard.get(key)?;
        if rank < 0 || rank as usize >= zset.len() {
            return None;
        }
        zset.ordered
            .iter()
            .rev()
            .nth(rank as usize)
            .map(|(score, member)| (member.clone(), score.0))
    }

    /// Members with `min <= score <= max`, ascending by (score, member).
    pub fn zscore_range(&self, key: &str, min: f64, max: f64) -> Vec<(String, f64)> {
        let guard = self.inner.read();
        let Some(zset) = guard.get(key) else {
            return Vec::new();
        };
        zset.ordered
            .range((
                Bound::Included((ScoreKey(min), String::new())),
                Bound::Unbounded,
            ))
            .take_while(|(score, _)| score.0 <= max)
            .map(|(score, member)| (member.clone(), score.0))
            .collect()
    }

    /// Members with `min <= score <= max`, descending by (score, member).
    pub fn zrev_score_range(&self, key: &str, max: f64, min: f64) -> Vec<(String, f64)> {
        let mut out = self.zscore_range(key, min, max);
        out.reverse();
        out
    }

    /// Whether the key holds any members.
    pub fn key_exists(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Remove the key and every member under it.
    pub fn clear(&self, key: &str) {
        self.inner.write().remove(key);
    }

    /// All sorted-set keys.
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }
}

impl Store for ZSetStore {
    fn data_type(&self) -> DataType {
        DataType::ZSet
    }

    fn evict(&self, expiry: &ExpiryMap) {
        let mut guard = self.inner.write();
        let expired: Vec<String> = guard
            .keys()
            .filter(|key| expiry.has_expired(DataType::ZSet, key))
            .cloned()
            .collect();

        for key in expired {
            guard.remove(&key);
            expiry.del(DataType::ZSet, &key);
        }
    }
}
