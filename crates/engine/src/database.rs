//! Database struct and open/close logic.
//!
//! The `Database` owns the four typed stores, the shared expiry map, the
//! append-only log handle, and the sweeper pool. All client access goes
//! through transactions ([`crate::Tx`]); the helpers here are the engine's
//! internal surface: journaling one record, TTL bookkeeping, and the lazy
//! eviction path used by reads.

use crate::replay;
use crate::sweeper::Sweeper;
use ember_core::types::{HashMark, SetMark, StrMark, ZSetMark};
use ember_core::{clock, Config, DataType, Error, Record, Result};
use ember_durability::{SyncPolicy, Wal, WalConfig};
use ember_storage::{ExpiryMap, HashStore, SetStore, Store, StrStore, ZSetStore};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// The engine facade: one instance per database.
///
/// Thread-safe; call it from any number of threads. A writable transaction
/// holds the engine lock exclusively, read-only transactions share it.
pub struct Database {
    config: Config,

    pub(crate) strings: Arc<StrStore>,
    pub(crate) hashes: Arc<HashStore>,
    pub(crate) sets: Arc<SetStore>,
    pub(crate) zsets: Arc<ZSetStore>,

    /// Shared `(type, key) → deadline` table.
    pub(crate) expiry: Arc<ExpiryMap>,

    /// Append-only log. `None` when persistence is disabled.
    pub(crate) wal: Option<Wal>,

    /// The engine lock serializing transactions. Guards no data directly;
    /// the stores carry their own locks.
    pub(crate) tx_lock: RwLock<()>,

    pub(crate) closed: AtomicBool,

    sweepers: Mutex<Vec<Sweeper>>,
}

impl Database {
    /// Open a database: validate config, build stores, open and replay the
    /// append-only log when a path is configured, then start the sweeper
    /// pool when an eviction interval is configured.
    pub fn open(mut config: Config) -> Result<Self> {
        config.validate();

        let wal = if config.persistence_enabled() {
            let wal = Wal::open(
                &config.path,
                WalConfig::default(),
                SyncPolicy::from_no_sync(config.no_sync),
            )
            .map_err(Error::from)?;
            Some(wal)
        } else {
            None
        };

        let db = Database {
            strings: Arc::new(StrStore::new()),
            hashes: Arc::new(HashStore::new()),
            sets: Arc::new(SetStore::new()),
            zsets: Arc::new(ZSetStore::new()),
            expiry: Arc::new(ExpiryMap::new()),
            wal,
            tx_lock: RwLock::new(()),
            closed: AtomicBool::new(false),
            sweepers: Mutex::new(Vec::new()),
            config,
        };

        replay::load(&db)?;
        db.start_sweepers();

        info!(
            path = %db.config.path,
            eviction_interval = db.config.eviction_interval,
            "database open"
        );
        Ok(db)
    }

    /// Close the database: refuse new transactions, stop the sweepers
    /// synchronously, and flush the log. Idempotent.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let sweepers = std::mem::take(&mut *self.sweepers.lock());
        for sweeper in sweepers {
            sweeper.stop();
        }

        if let Some(wal) = &self.wal {
            wal.close().map_err(Error::from)?;
        }

        info!("database closed");
        Ok(())
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn start_sweepers(&self) {
        let period = self.config.eviction_period();
        if period.is_zero() {
            return;
        }

        let stores: [Arc<dyn Store>; 4] = [
            self.strings.clone(),
            self.hashes.clone(),
            self.sets.clone(),
            self.zsets.clone(),
        ];

        let mut sweepers = self.sweepers.lock();
        for store in stores {
            sweepers.push(Sweeper::spawn(store, self.expiry.clone(), period));
        }
    }

    // === Internal helpers used by transactions and replay ===

    /// Whether a write-ahead step happens before applying mutations.
    pub(crate) fn persisting(&self) -> bool {
        self.wal.is_some()
    }

    /// Journal one record outside any transaction. Used by the lazy
    /// eviction path; a no-op when persistence is disabled.
    pub(crate) fn write_record(&self, record: &Record) -> Result<()> {
        let Some(wal) = &self.wal else {
            return Ok(());
        };
        let bytes = record.encode()?;
        wal.append(&bytes).map_err(Error::from)
    }

    /// Record a deadline for a key.
    pub(crate) fn set_ttl(&self, data_type: DataType, key: &str, deadline: i64) {
        self.expiry.set(data_type, key, deadline);
    }

    /// Deadline for a key, if one is set.
    pub(crate) fn get_ttl(&self, data_type: DataType, key: &str) -> Option<i64> {
        self.expiry.get(data_type, key)
    }

    /// Whether the key carries a deadline that has passed.
    pub(crate) fn has_expired(&self, key: &str, data_type: DataType) -> bool {
        self.expiry.has_expired(data_type, key)
    }

    /// Lazily evict a key whose deadline has elapsed.
    ///
    /// Synthesizes the matching clear record, journals it directly
    /// (bypassing transactions — this is internal maintenance), then drops
    /// the key from its store and the expiry map. Safe under a held engine
    /// read lock: the stores and expiry map carry their own locks and the
    /// log serializes appends internally.
    ///
    /// # Panics
    ///
    /// Panics when the journal append fails: losing an eviction record
    /// would resurrect the key on replay.
    pub(crate) fn evict(&self, key: &str, data_type: DataType) {
        let Some(deadline) = self.expiry.get(data_type, key) else {
            return;
        };
        if clock::unix_seconds() <= deadline {
            return;
        }

        let key_bytes = key.as_bytes();
        let record = match data_type {
            DataType::String => {
                Record::new(key_bytes, b"", DataType::String, StrMark::Rem.code())
            }
            DataType::Hash => Record::new(key_bytes, b"", DataType::Hash, HashMark::HClear.code()),
            DataType::Set => Record::new(key_bytes, b"", DataType::Set, SetMark::SClear.code()),
            DataType::ZSet => Record::new(key_bytes, b"", DataType::ZSet, ZSetMark::ZClear.code()),
        };

        if let Err(e) = self.write_record(&record) {
            error!(key, data_type = data_type.name(), "eviction write failed: {}", e);
            panic!("eviction write failed: {}", e);
        }

        match data_type {
            DataType::String => {
                self.strings.remove(key_bytes);
            }
            DataType::Hash => self.hashes.clear(key),
            DataType::Set => self.sets.clear(key),
            DataType::ZSet => self.zsets.clear(key),
        }
        self.expiry.del(data_type, key);
    }
}

/// Best-effort close when the handle is dropped without an explicit close.
impl Drop for Database {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open(Config::in_memory()).unwrap();
        assert!(!db.persisting());
        db.close().unwrap();
    }

    #[test]
    fn test_begin_after_close() {
        let db = Database::open(Config::in_memory()).unwrap();
        db.close().unwrap();
        assert!(matches!(db.begin(true), Err(Error::DatabaseClosed)));
        assert!(matches!(db.begin(false), Err(Error::DatabaseClosed)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let db = Database::open(Config::in_memory()).unwrap();
        db.close().unwrap();
        db.close().unwrap();
    }

    #[test]
    fn test_evict_only_elapsed_keys() {
        let db = Database::open(Config::in_memory()).unwrap();
        let now = clock::unix_seconds();

        db.strings.insert(b"fresh", "v".to_string());
        db.set_ttl(DataType::String, "fresh", now + 100);
        db.evict("fresh", DataType::String);
        assert!(db.strings.contains(b"fresh"));

        db.strings.insert(b"stale", "v".to_string());
        db.set_ttl(DataType::String, "stale", now - 100);
        db.evict("stale", DataType::String);
        assert!(!db.strings.contains(b"stale"));
        assert_eq!(db.get_ttl(DataType::String, "stale"), None);
    }

    #[test]
    fn test_evict_without_deadline_is_noop() {
        let db = Database::open(Config::in_memory()).unwrap();
        db.strings.insert(b"k", "v".to_string());
        db.evict("k", DataType::String);
        assert!(db.strings.contains(b"k"));
    }
}
