//! Sorted-set operations on a transaction.
//!
//! Scores are journaled as decimal text in the record's value field, always
//! as the member's new absolute score — so replaying the log is idempotent
//! even for increments.

use crate::Tx;
use ember_core::types::ZSetMark;
use ember_core::{clock, DataType, Error, Record, Result};

/// Shortest round-trip decimal form of a score.
fn score_text(score: f64) -> String {
    score.to_string()
}

impl Tx<'_> {
    /// Add a member with a score, or update its score (upsert). Re-adding a
    /// member with its current score is a no-op.
    pub fn zadd(&mut self, key: &str, score: f64, member: &str) -> Result<()> {
        self.ensure_writable()?;
        if self.zscore(key, member)? == Some(score) {
            return Ok(());
        }

        self.stage(Record::with_value(
            key.as_bytes(),
            member.as_bytes(),
            score_text(score).as_bytes(),
            DataType::ZSet,
            ZSetMark::ZAdd.code(),
        ));
        Ok(())
    }

    /// Score of `member` at `key`, if present.
    pub fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(None);
        }
        Ok(self.db.zsets.zscore(key, member))
    }

    /// Cardinality of the sorted set at `key`.
    pub fn zcard(&self, key: &str) -> Result<i64> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(0);
        }
        Ok(self.db.zsets.zcard(key))
    }

    /// Ascending 0-based rank of `member`, or -1 when absent. Ties are
    /// broken by member byte order.
    pub fn zrank(&self, key: &str, member: &str) -> Result<i64> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(-1);
        }
        Ok(self.db.zsets.zrank(key, member))
    }

    /// Descending 0-based rank of `member`, or -1 when absent.
    pub fn zrevrank(&self, key: &str, member: &str) -> Result<i64> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(-1);
        }
        Ok(self.db.zsets.zrevrank(key, member))
    }

    /// Add `delta` to the member's score (missing members start at zero)
    /// and return the new score. The journaled record carries the absolute
    /// result, not the increment.
    pub fn zincrby(&mut self, key: &str, delta: f64, member: &str) -> Result<f64> {
        self.ensure_writable()?;
        let next = self.zscore(key, member)?.unwrap_or(0.0) + delta;

        self.stage(Record::with_value(
            key.as_bytes(),
            member.as_bytes(),
            score_text(next).as_bytes(),
            DataType::ZSet,
            ZSetMark::ZAdd.code(),
        ));
        Ok(next)
    }

    /// Members in the inclusive rank window `[start, stop]`, ascending.
    /// Negative indices count from the end.
    pub fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        Ok(self
            .zrange_with_scores(key, start, stop)?
            .into_iter()
            .map(|(member, _)| member)
            .collect())
    }

    /// Like `zrange`, with each member's score.
    pub fn zrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<(String, f64)>> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(Vec::new());
        }
        Ok(self.db.zsets.zrange(key, start, stop))
    }

    /// Members in the inclusive rank window `[start, stop]`, descending.
    pub fn zrevrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        Ok(self
            .zrevrange_with_scores(key, start, stop)?
            .into_iter()
            .map(|(member, _)| member)
            .collect())
    }

    /// Like `zrevrange`, with each member's score.
    pub fn zrevrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<(String, f64)>> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(Vec::new());
        }
        Ok(self.db.zsets.zrevrange(key, start, stop))
    }

    /// Remove `member` from the sorted set at `key`. Returns whether it was
    /// present.
    pub fn zrem(&mut self, key: &str, member: &str) -> Result<bool> {
        self.ensure_writable()?;
        if self.expire_zset_if_needed(key) {
            return Ok(false);
        }
        if self.db.zsets.zscore(key, member).is_none() {
            return Ok(false);
        }

        self.stage(Record::new(
            key.as_bytes(),
            member.as_bytes(),
            DataType::ZSet,
            ZSetMark::ZRem.code(),
        ));
        Ok(true)
    }

    /// The member at the given ascending rank, with its score.
    pub fn zget_by_rank(&self, key: &str, rank: i64) -> Result<Option<(String, f64)>> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(None);
        }
        Ok(self.db.zsets.zget_by_rank(key, rank))
    }

    /// The member at the given descending rank, with its score.
    pub fn zrev_get_by_rank(&self, key: &str, rank: i64) -> Result<Option<(String, f64)>> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(None);
        }
        Ok(self.db.zsets.zrev_get_by_rank(key, rank))
    }

    /// Members with `min <= score <= max`, ascending by (score, member).
    pub fn zscore_range(&self, key: &str, min: f64, max: f64) -> Result<Vec<(String, f64)>> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(Vec::new());
        }
        Ok(self.db.zsets.zscore_range(key, min, max))
    }

    /// Members with `min <= score <= max`, descending by (score, member).
    pub fn zrev_score_range(&self, key: &str, max: f64, min: f64) -> Result<Vec<(String, f64)>> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(Vec::new());
        }
        Ok(self.db.zsets.zrev_score_range(key, max, min))
    }

    /// Whether the sorted-set key exists.
    pub fn zkey_exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(false);
        }
        Ok(self.db.zsets.key_exists(key))
    }

    /// Remove the key and every member under it. A no-op for a missing key.
    pub fn zclear(&mut self, key: &str) -> Result<()> {
        self.ensure_writable()?;
        if !self.zkey_exists(key)? {
            return Ok(());
        }

        self.stage(Record::new(
            key.as_bytes(),
            b"",
            DataType::ZSet,
            ZSetMark::ZClear.code(),
        ));
        Ok(())
    }

    /// Attach an expiry `duration` seconds from now to an existing
    /// sorted-set key.
    pub fn zexpire(&mut self, key: &str, duration: i64) -> Result<()> {
        self.ensure_writable()?;
        if duration <= 0 {
            return Err(Error::InvalidTtl);
        }
        if !self.zkey_exists(key)? {
            return Err(Error::InvalidKey);
        }

        let deadline = clock::unix_seconds() + duration;
        self.stage(Record::with_deadline(
            key.as_bytes(),
            b"",
            deadline,
            DataType::ZSet,
            ZSetMark::ZExpire.code(),
        ));
        Ok(())
    }

    /// Remaining seconds before the sorted-set key expires; 0 when it has
    /// no deadline or has already expired.
    pub fn zttl(&self, key: &str) -> Result<i64> {
        self.ensure_open()?;
        if self.expire_zset_if_needed(key) {
            return Ok(0);
        }
        match self.db.get_ttl(DataType::ZSet, key) {
            Some(deadline) => Ok(deadline - clock::unix_seconds()),
            None => Ok(0),
        }
    }

    /// Lazy check-on-access eviction for sorted-set keys.
    fn expire_zset_if_needed(&self, key: &str) -> bool {
        if self.db.has_expired(key, DataType::ZSet) {
            self.db.evict(key, DataType::ZSet);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use ember_core::{Config, Error};

    fn in_memory() -> Database {
        Database::open(Config::in_memory()).unwrap()
    }

    fn abc_db() -> Database {
        let db = in_memory();
        db.update(|tx| {
            tx.zadd("z", 1.0, "a")?;
            tx.zadd("z", 2.0, "b")?;
            tx.zadd("z", 3.0, "c")
        })
        .unwrap();
        db
    }

    #[test]
    fn test_ranking() {
        let db = abc_db();
        db.view(|tx| {
            assert_eq!(tx.zrank("z", "a")?, 0);
            assert_eq!(tx.zrevrank("z", "a")?, 2);
            assert_eq!(tx.zrank("z", "missing")?, -1);
            assert_eq!(
                tx.zrange("z", 0, -1)?,
                vec!["a".to_string(), "b".to_string(), "c".to_string()]
            );
            assert_eq!(tx.zscore("z", "b")?, Some(2.0));
            assert_eq!(tx.zcard("z")?, 3);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_zadd_updates_score() {
        let db = abc_db();
        db.update(|tx| tx.zadd("z", 10.0, "a")).unwrap();
        db.view(|tx| {
            assert_eq!(tx.zscore("z", "a")?, Some(10.0));
            assert_eq!(tx.zrank("z", "a")?, 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_zadd_same_score_stages_nothing() {
        let db = abc_db();
        let mut tx = db.begin(true).unwrap();
        tx.zadd("z", 2.0, "b").unwrap();
        assert_eq!(tx.pending_records(), 0);
        tx.zadd("z", 2.5, "b").unwrap();
        assert_eq!(tx.pending_records(), 1);
        tx.rollback().unwrap();
    }

    #[test]
    fn test_zrem() {
        let db = abc_db();
        db.update(|tx| {
            assert!(tx.zrem("z", "b")?);
            assert!(!tx.zrem("z", "missing")?);
            Ok(())
        })
        .unwrap();
        db.view(|tx| {
            assert_eq!(tx.zcard("z")?, 2);
            assert_eq!(tx.zscore("z", "b")?, None);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_zincrby() {
        let db = in_memory();
        let first = db.update(|tx| tx.zincrby("z", 2.5, "m")).unwrap();
        assert_eq!(first, 2.5);
        let second = db.update(|tx| tx.zincrby("z", 2.5, "m")).unwrap();
        assert_eq!(second, 5.0);
        db.view(|tx| {
            assert_eq!(tx.zscore("z", "m")?, Some(5.0));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_ranges_with_scores() {
        let db = abc_db();
        db.view(|tx| {
            assert_eq!(
                tx.zrange_with_scores("z", 0, 1)?,
                vec![("a".to_string(), 1.0), ("b".to_string(), 2.0)]
            );
            assert_eq!(
                tx.zrevrange("z", 0, -1)?,
                vec!["c".to_string(), "b".to_string(), "a".to_string()]
            );
            assert_eq!(
                tx.zrevrange_with_scores("z", 0, 0)?,
                vec![("c".to_string(), 3.0)]
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_get_by_rank() {
        let db = abc_db();
        db.view(|tx| {
            assert_eq!(tx.zget_by_rank("z", 1)?, Some(("b".to_string(), 2.0)));
            assert_eq!(tx.zrev_get_by_rank("z", 0)?, Some(("c".to_string(), 3.0)));
            assert_eq!(tx.zget_by_rank("z", 99)?, None);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_score_ranges() {
        let db = abc_db();
        db.view(|tx| {
            assert_eq!(
                tx.zscore_range("z", 1.5, 3.0)?,
                vec![("b".to_string(), 2.0), ("c".to_string(), 3.0)]
            );
            assert_eq!(
                tx.zrev_score_range("z", 3.0, 1.5)?,
                vec![("c".to_string(), 3.0), ("b".to_string(), 2.0)]
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_zclear() {
        let db = abc_db();
        db.update(|tx| tx.zclear("z")).unwrap();
        db.view(|tx| {
            assert!(!tx.zkey_exists("z")?);
            assert!(tx.zrange("z", 0, -1)?.is_empty());
            Ok(())
        })
        .unwrap();
        // Clearing a missing key is a quiet no-op.
        db.update(|tx| tx.zclear("z")).unwrap();
    }

    #[test]
    fn test_zexpire_and_zttl() {
        let db = abc_db();
        assert!(matches!(
            db.update(|tx| tx.zexpire("z", 0)),
            Err(Error::InvalidTtl)
        ));
        assert!(matches!(
            db.update(|tx| tx.zexpire("missing", 5)),
            Err(Error::InvalidKey)
        ));

        db.update(|tx| tx.zexpire("z", 75)).unwrap();
        db.view(|tx| {
            let ttl = tx.zttl("z")?;
            assert!(ttl > 0 && ttl <= 75);
            Ok(())
        })
        .unwrap();
    }
}
