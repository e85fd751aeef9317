//! Hash operations on a transaction.
//!
//! Every read checks the key's deadline first and lazily evicts an expired
//! key, reporting it empty. Mutations stage records; nothing touches the
//! hash store until commit.

use crate::Tx;
use ember_core::types::HashMark;
use ember_core::{clock, DataType, Error, Record, Result};

impl Tx<'_> {
    /// Set `field` in the hash stored at `key`. Returns 1 when the field
    /// was created, 0 when it was overwritten. Writing the value the field
    /// already holds is a no-op.
    pub fn hset(&mut self, key: &str, field: &str, value: &str) -> Result<i64> {
        self.ensure_writable()?;

        let current = self.hget(key, field)?;
        if current.as_deref() == Some(value) {
            return Ok(0);
        }
        let delta = i64::from(current.is_none());

        self.stage(Record::with_value(
            key.as_bytes(),
            field.as_bytes(),
            value.as_bytes(),
            DataType::Hash,
            HashMark::HSet.code(),
        ));
        Ok(delta)
    }

    /// Value associated with `field` in the hash stored at `key`.
    pub fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        if self.expire_hash_if_needed(key) {
            return Ok(None);
        }
        Ok(self.db.hashes.hget(key, field))
    }

    /// All fields and values stored at `key`.
    pub fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>> {
        self.ensure_open()?;
        if self.expire_hash_if_needed(key) {
            return Ok(Vec::new());
        }
        Ok(self.db.hashes.hgetall(key))
    }

    /// Delete `field` from the hash stored at `key`. Returns the number of
    /// fields removed (0 or 1).
    pub fn hdel(&mut self, key: &str, field: &str) -> Result<i64> {
        self.ensure_writable()?;
        if self.expire_hash_if_needed(key) {
            return Ok(0);
        }
        if !self.db.hashes.hexists(key, field) {
            return Ok(0);
        }

        self.stage(Record::new(
            key.as_bytes(),
            field.as_bytes(),
            DataType::Hash,
            HashMark::HDel.code(),
        ));
        Ok(1)
    }

    /// Whether the hash key exists.
    pub fn hkey_exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        if self.expire_hash_if_needed(key) {
            return Ok(false);
        }
        Ok(self.db.hashes.key_exists(key))
    }

    /// Whether `field` exists in the hash stored at `key`.
    pub fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        self.ensure_open()?;
        if self.expire_hash_if_needed(key) {
            return Ok(false);
        }
        Ok(self.db.hashes.hexists(key, field))
    }

    /// Number of fields stored at `key`.
    pub fn hlen(&self, key: &str) -> Result<i64> {
        self.ensure_open()?;
        if self.expire_hash_if_needed(key) {
            return Ok(0);
        }
        Ok(self.db.hashes.hlen(key))
    }

    /// All field names stored at `key`.
    pub fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        if self.expire_hash_if_needed(key) {
            return Ok(Vec::new());
        }
        Ok(self.db.hashes.hkeys(key))
    }

    /// All values stored at `key`.
    pub fn hvals(&self, key: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        if self.expire_hash_if_needed(key) {
            return Ok(Vec::new());
        }
        Ok(self.db.hashes.hvals(key))
    }

    /// Remove the key and every field under it. A no-op for a missing key.
    pub fn hclear(&mut self, key: &str) -> Result<()> {
        self.ensure_writable()?;
        if self.expire_hash_if_needed(key) {
            return Ok(());
        }
        if !self.db.hashes.key_exists(key) {
            return Ok(());
        }

        self.stage(Record::new(
            key.as_bytes(),
            b"",
            DataType::Hash,
            HashMark::HClear.code(),
        ));
        Ok(())
    }

    /// Attach an expiry `duration` seconds from now to an existing hash key.
    pub fn hexpire(&mut self, key: &str, duration: i64) -> Result<()> {
        self.ensure_writable()?;
        if duration <= 0 {
            return Err(Error::InvalidTtl);
        }
        if !self.hkey_exists(key)? {
            return Err(Error::InvalidKey);
        }

        let deadline = clock::unix_seconds() + duration;
        self.stage(Record::with_deadline(
            key.as_bytes(),
            b"",
            deadline,
            DataType::Hash,
            HashMark::HExpire.code(),
        ));
        Ok(())
    }

    /// Remaining seconds before the hash key expires; 0 when it has no
    /// deadline or has already expired.
    pub fn httl(&self, key: &str) -> Result<i64> {
        self.ensure_open()?;
        if self.expire_hash_if_needed(key) {
            return Ok(0);
        }
        match self.db.get_ttl(DataType::Hash, key) {
            Some(deadline) => Ok(deadline - clock::unix_seconds()),
            None => Ok(0),
        }
    }

    /// Lazy check-on-access eviction for hash keys. Returns whether the key
    /// was expired (and is now gone).
    fn expire_hash_if_needed(&self, key: &str) -> bool {
        if self.db.has_expired(key, DataType::Hash) {
            self.db.evict(key, DataType::Hash);
            return true;
        }
        false
    }
}
