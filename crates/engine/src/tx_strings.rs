//! String operations on a transaction.

use crate::Tx;
use ember_core::types::StrMark;
use ember_core::{clock, DataType, Error, Record, Result};

impl Tx<'_> {
    /// Save a key-value pair.
    ///
    /// Setting a key to its current value is a no-op: no record is staged
    /// and nothing is journaled.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.ensure_writable()?;

        let unchanged = self.db.strings.get(key.as_bytes()).as_deref() == Some(value)
            && !self.db.has_expired(key, DataType::String);
        if unchanged {
            return Ok(());
        }

        self.stage(Record::new(
            key.as_bytes(),
            value.as_bytes(),
            DataType::String,
            StrMark::Set.code(),
        ));
        Ok(())
    }

    /// Save a key-value pair with an expiry `duration` seconds from now.
    ///
    /// Staged as a set record followed by an expire record, so replay
    /// restores both the value and the deadline.
    pub fn setex(&mut self, key: &str, value: &str, duration: i64) -> Result<()> {
        self.ensure_writable()?;
        if duration <= 0 {
            return Err(Error::InvalidTtl);
        }

        let deadline = clock::unix_seconds() + duration;
        self.stage(Record::new(
            key.as_bytes(),
            value.as_bytes(),
            DataType::String,
            StrMark::Set.code(),
        ));
        self.stage(Record::with_deadline(
            key.as_bytes(),
            b"",
            deadline,
            DataType::String,
            StrMark::Expire.code(),
        ));
        Ok(())
    }

    /// Value of the given key.
    ///
    /// Returns `InvalidKey` for a missing key and `ExpiredKey` for one
    /// whose TTL elapsed (the key is lazily evicted on the way out).
    pub fn get(&self, key: &str) -> Result<String> {
        self.ensure_open()?;

        let Some(value) = self.db.strings.get(key.as_bytes()) else {
            return Err(Error::InvalidKey);
        };
        if self.db.has_expired(key, DataType::String) {
            self.db.evict(key, DataType::String);
            return Err(Error::ExpiredKey);
        }
        Ok(value)
    }

    /// Delete the given key.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.ensure_writable()?;
        self.stage(Record::new(
            key.as_bytes(),
            b"",
            DataType::String,
            StrMark::Rem.code(),
        ));
        Ok(())
    }

    /// Attach an expiry `duration` seconds from now to an existing key.
    pub fn expire(&mut self, key: &str, duration: i64) -> Result<()> {
        self.ensure_writable()?;
        if duration <= 0 {
            return Err(Error::InvalidTtl);
        }
        self.get(key)?;

        let deadline = clock::unix_seconds() + duration;
        self.stage(Record::with_deadline(
            key.as_bytes(),
            b"",
            deadline,
            DataType::String,
            StrMark::Expire.code(),
        ));
        Ok(())
    }

    /// Remaining seconds before the key expires; 0 when the key has no
    /// deadline or has already expired.
    pub fn ttl(&self, key: &str) -> Result<i64> {
        self.ensure_open()?;

        if self.db.has_expired(key, DataType::String) {
            self.db.evict(key, DataType::String);
            return Ok(0);
        }
        match self.db.get_ttl(DataType::String, key) {
            Some(deadline) => Ok(deadline - clock::unix_seconds()),
            None => Ok(0),
        }
    }

    /// Whether the key exists. An expired key is evicted and reported
    /// absent.
    pub fn exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;

        if !self.db.strings.contains(key.as_bytes()) {
            return Ok(false);
        }
        if self.db.has_expired(key, DataType::String) {
            self.db.evict(key, DataType::String);
            return Ok(false);
        }
        Ok(true)
    }
}
