//! Transactions.
//!
//! A transaction is either read-only or read/write. Read-only transactions
//! can run concurrently; a read/write transaction holds the engine lock
//! exclusively. Mutating operations never touch the stores directly — they
//! stage records on the transaction, and `commit` applies the whole batch
//! only after it has been durably journaled (write-ahead ordering). Every
//! transaction must finish with `commit` or `rollback`.

use crate::replay;
use crate::Database;
use ember_core::{Error, Record, Result};
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::Ordering;

/// The engine lock held for the lifetime of a transaction.
enum TxGuard<'db> {
    Read(#[allow(dead_code)] RwLockReadGuard<'db, ()>),
    Write(#[allow(dead_code)] RwLockWriteGuard<'db, ()>),
}

/// A transaction on the database.
///
/// Created by [`Database::begin`]; invalidated by [`Tx::commit`] or
/// [`Tx::rollback`]. Any use after that returns [`Error::TxClosed`].
pub struct Tx<'db> {
    pub(crate) db: &'db Database,
    writable: bool,
    guard: Option<TxGuard<'db>>,
    pending: Vec<Record>,
}

impl Database {
    /// Open a new transaction.
    ///
    /// Any number of read-only transactions may run at once, but only one
    /// read/write transaction; opening a writable transaction blocks until
    /// the current writer finishes.
    pub fn begin(&self, writable: bool) -> Result<Tx<'_>> {
        let guard = if writable {
            TxGuard::Write(self.tx_lock.write())
        } else {
            TxGuard::Read(self.tx_lock.read())
        };

        if self.closed.load(Ordering::SeqCst) {
            drop(guard);
            return Err(Error::DatabaseClosed);
        }

        Ok(Tx {
            db: self,
            writable,
            guard: Some(guard),
            pending: Vec::new(),
        })
    }

    /// Run `f` inside a managed read-only transaction, always rolled back.
    pub fn view<T>(&self, f: impl FnOnce(&mut Tx) -> Result<T>) -> Result<T> {
        let mut tx = self.begin(false)?;
        let result = f(&mut tx);
        tx.rollback()?;
        result
    }

    /// Run `f` inside a managed read/write transaction: committed when `f`
    /// succeeds, rolled back (staged records discarded, nothing applied)
    /// when it fails.
    pub fn update<T>(&self, f: impl FnOnce(&mut Tx) -> Result<T>) -> Result<T> {
        let mut tx = self.begin(true)?;
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                let _ = tx.rollback();
                Err(e)
            }
        }
    }
}

impl<'db> Tx<'db> {
    /// Fail with `TxClosed` once the transaction has been committed or
    /// rolled back.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.guard.is_none() {
            return Err(Error::TxClosed);
        }
        Ok(())
    }

    /// Like `ensure_open`, additionally rejecting read-only transactions.
    pub(crate) fn ensure_writable(&self) -> Result<()> {
        self.ensure_open()?;
        if !self.writable {
            return Err(Error::TxNotWritable);
        }
        Ok(())
    }

    /// Stage a record for commit.
    pub(crate) fn stage(&mut self, record: Record) {
        self.pending.push(record);
    }

    /// Number of records staged so far.
    pub fn pending_records(&self) -> usize {
        self.pending.len()
    }

    /// Commit the transaction.
    ///
    /// The staged batch is encoded and appended to the log first; only on
    /// success is each record applied to the stores, in staging order. A
    /// journal failure discards the batch so no partial state is visible.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        if !self.writable {
            return Err(Error::TxNotWritable);
        }

        let db = self.db;
        if db.persisting() && !self.pending.is_empty() {
            let mut batch = Vec::with_capacity(self.pending.len());
            for record in &self.pending {
                match record.encode() {
                    Ok(bytes) => batch.push(bytes),
                    Err(e) => {
                        self.pending.clear();
                        self.release();
                        return Err(e);
                    }
                }
            }

            if let Some(wal) = &db.wal {
                if let Err(e) = wal.append_batch(&batch) {
                    self.pending.clear();
                    self.release();
                    return Err(e.into());
                }
            }
        }

        // Durable — now make it visible, in staging order.
        let records = std::mem::take(&mut self.pending);
        let mut result = Ok(());
        for record in &records {
            if let Err(e) = replay::apply_record(db, record) {
                result = Err(e);
                break;
            }
        }

        self.release();
        result
    }

    /// Roll back the transaction, discarding staged records. Read-only
    /// transactions simply release the engine lock. Returns `TxClosed` on
    /// reuse.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.pending.clear();
        self.release();
        Ok(())
    }

    fn release(&mut self) {
        self.guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Config;

    fn in_memory() -> Database {
        Database::open(Config::in_memory()).unwrap()
    }

    #[test]
    fn test_commit_requires_writable() {
        let db = in_memory();
        let mut tx = db.begin(false).unwrap();
        assert!(matches!(tx.commit(), Err(Error::TxNotWritable)));
        tx.rollback().unwrap();
    }

    #[test]
    fn test_reuse_after_commit_fails() {
        let db = in_memory();
        let mut tx = db.begin(true).unwrap();
        tx.commit().unwrap();
        assert!(matches!(tx.commit(), Err(Error::TxClosed)));
        assert!(matches!(tx.rollback(), Err(Error::TxClosed)));
        assert!(matches!(tx.get("k"), Err(Error::TxClosed)));
    }

    #[test]
    fn test_rollback_is_not_idempotent() {
        let db = in_memory();
        let mut tx = db.begin(true).unwrap();
        tx.rollback().unwrap();
        assert!(matches!(tx.rollback(), Err(Error::TxClosed)));
    }

    #[test]
    fn test_writes_invisible_before_commit() {
        let db = in_memory();
        let mut tx = db.begin(true).unwrap();
        tx.set("k", "v").unwrap();
        assert_eq!(tx.pending_records(), 1);
        // Deferred apply: the store stays untouched until commit.
        assert!(matches!(tx.get("k"), Err(Error::InvalidKey)));
        tx.commit().unwrap();

        db.view(|tx| {
            assert_eq!(tx.get("k").unwrap(), "v");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_rollback_discards_writes() {
        let db = in_memory();
        let mut tx = db.begin(true).unwrap();
        tx.set("k", "v").unwrap();
        tx.rollback().unwrap();

        db.view(|tx| {
            assert!(matches!(tx.get("k"), Err(Error::InvalidKey)));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_rolls_back_on_error() {
        let db = in_memory();
        let result: Result<()> = db.update(|tx| {
            tx.set("k", "v")?;
            Err(Error::InvalidTtl)
        });
        assert!(matches!(result, Err(Error::InvalidTtl)));

        db.view(|tx| {
            assert!(matches!(tx.get("k"), Err(Error::InvalidKey)));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_view_cannot_write() {
        let db = in_memory();
        let result = db.view(|tx| tx.set("k", "v"));
        assert!(matches!(result, Err(Error::TxNotWritable)));
    }

    #[test]
    fn test_concurrent_readers() {
        let db = in_memory();
        let tx1 = db.begin(false).unwrap();
        let tx2 = db.begin(false).unwrap();
        drop(tx1);
        drop(tx2);
    }

    #[test]
    fn test_writer_ordering_across_threads() {
        use std::sync::Arc;

        let db = Arc::new(in_memory());
        let mut handles = Vec::new();
        for i in 0..4 {
            let db = Arc::clone(&db);
            handles.push(std::thread::spawn(move || {
                db.update(|tx| tx.set(&format!("k{}", i), "v")).unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        db.view(|tx| {
            for i in 0..4 {
                assert_eq!(tx.get(&format!("k{}", i)).unwrap(), "v");
            }
            Ok(())
        })
        .unwrap();
    }
}
