//! Set operations on a transaction.

use crate::Tx;
use ember_core::types::SetMark;
use ember_core::{clock, DataType, Error, Record, Result};

impl Tx<'_> {
    /// Add a member to the set at `key`. Returns 1 when the member was not
    /// already present, 0 otherwise.
    pub fn sadd(&mut self, key: &str, member: &str) -> Result<i64> {
        self.ensure_writable()?;
        if self.db.sets.sismember(key, member) {
            return Ok(0);
        }

        self.stage(Record::new(
            key.as_bytes(),
            member.as_bytes(),
            DataType::Set,
            SetMark::SAdd.code(),
        ));
        Ok(1)
    }

    /// Remove a member from the set at `key`. Returns whether it was
    /// present.
    pub fn srem(&mut self, key: &str, member: &str) -> Result<bool> {
        self.ensure_writable()?;
        if self.expire_set_if_needed(key) {
            return Ok(false);
        }
        if !self.db.sets.sismember(key, member) {
            return Ok(false);
        }

        self.stage(Record::new(
            key.as_bytes(),
            member.as_bytes(),
            DataType::Set,
            SetMark::SRem.code(),
        ));
        Ok(true)
    }

    /// Remove and return up to `count` random members, without replacement.
    pub fn spop(&mut self, key: &str, count: usize) -> Result<Vec<String>> {
        self.ensure_writable()?;
        if self.expire_set_if_needed(key) {
            return Ok(Vec::new());
        }

        let popped = self.db.sets.srandmember(key, count as i64);
        for member in &popped {
            self.stage(Record::new(
                key.as_bytes(),
                member.as_bytes(),
                DataType::Set,
                SetMark::SRem.code(),
            ));
        }
        Ok(popped)
    }

    /// Whether `member` is in the set at `key`.
    pub fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        self.ensure_open()?;
        if self.expire_set_if_needed(key) {
            return Ok(false);
        }
        Ok(self.db.sets.sismember(key, member))
    }

    /// Random members of the set at `key`, Redis count semantics.
    pub fn srandmember(&self, key: &str, count: i64) -> Result<Vec<String>> {
        self.ensure_open()?;
        if self.expire_set_if_needed(key) {
            return Ok(Vec::new());
        }
        Ok(self.db.sets.srandmember(key, count))
    }

    /// Move `member` from the set at `src` to the set at `dst`. Returns
    /// whether the member was present in `src`.
    pub fn smove(&mut self, src: &str, dst: &str, member: &str) -> Result<bool> {
        self.ensure_writable()?;
        if self.expire_set_if_needed(src) || self.expire_set_if_needed(dst) {
            return Err(Error::ExpiredKey);
        }
        if !self.db.sets.sismember(src, member) {
            return Ok(false);
        }

        self.stage(Record::with_value(
            src.as_bytes(),
            member.as_bytes(),
            dst.as_bytes(),
            DataType::Set,
            SetMark::SMove.code(),
        ));
        Ok(true)
    }

    /// Cardinality of the set at `key`.
    pub fn scard(&self, key: &str) -> Result<i64> {
        self.ensure_open()?;
        if self.expire_set_if_needed(key) {
            return Ok(0);
        }
        Ok(self.db.sets.scard(key))
    }

    /// All members of the set at `key`, arbitrary order.
    pub fn smembers(&self, key: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        if self.expire_set_if_needed(key) {
            return Ok(Vec::new());
        }
        Ok(self.db.sets.smembers(key))
    }

    /// Distinct members across all listed keys. Expired keys are evicted
    /// and skipped.
    pub fn sunion(&self, keys: &[&str]) -> Result<Vec<String>> {
        self.ensure_open()?;
        let active = self.live_set_keys(keys);
        Ok(self.db.sets.sunion(&active))
    }

    /// Members of the first key that appear in none of the rest. Expired
    /// keys are evicted and skipped.
    pub fn sdiff(&self, keys: &[&str]) -> Result<Vec<String>> {
        self.ensure_open()?;
        let active = self.live_set_keys(keys);
        Ok(self.db.sets.sdiff(&active))
    }

    /// Whether the set key exists.
    pub fn skey_exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        if self.expire_set_if_needed(key) {
            return Ok(false);
        }
        Ok(self.db.sets.key_exists(key))
    }

    /// Remove the key and every member under it.
    pub fn sclear(&mut self, key: &str) -> Result<()> {
        self.ensure_writable()?;
        if !self.skey_exists(key)? {
            return Err(Error::InvalidKey);
        }

        self.stage(Record::new(
            key.as_bytes(),
            b"",
            DataType::Set,
            SetMark::SClear.code(),
        ));
        Ok(())
    }

    /// Attach an expiry `duration` seconds from now to an existing set key.
    pub fn sexpire(&mut self, key: &str, duration: i64) -> Result<()> {
        self.ensure_writable()?;
        if duration <= 0 {
            return Err(Error::InvalidTtl);
        }
        if !self.skey_exists(key)? {
            return Err(Error::InvalidKey);
        }

        let deadline = clock::unix_seconds() + duration;
        self.stage(Record::with_deadline(
            key.as_bytes(),
            b"",
            deadline,
            DataType::Set,
            SetMark::SExpire.code(),
        ));
        Ok(())
    }

    /// Remaining seconds before the set key expires; 0 when it has no
    /// deadline or has already expired.
    pub fn sttl(&self, key: &str) -> Result<i64> {
        self.ensure_open()?;
        if self.expire_set_if_needed(key) {
            return Ok(0);
        }
        match self.db.get_ttl(DataType::Set, key) {
            Some(deadline) => Ok(deadline - clock::unix_seconds()),
            None => Ok(0),
        }
    }

    fn live_set_keys<'k>(&self, keys: &[&'k str]) -> Vec<&'k str> {
        keys.iter()
            .copied()
            .filter(|key| !self.expire_set_if_needed(key))
            .collect()
    }

    /// Lazy check-on-access eviction for set keys.
    fn expire_set_if_needed(&self, key: &str) -> bool {
        if self.db.has_expired(key, DataType::Set) {
            self.db.evict(key, DataType::Set);
            return true;
        }
        false
    }
}
