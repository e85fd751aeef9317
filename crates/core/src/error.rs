//! Error types for EmberDB
//!
//! One caller-visible error enum is used across the whole engine. We use
//! `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Error Categories
//!
//! - **Key state**: `InvalidKey`, `ExpiredKey`
//! - **Input validation**: `InvalidTtl`
//! - **Transaction lifecycle**: `TxClosed`, `TxNotWritable`, `DatabaseClosed`
//! - **Log integrity**: `InvalidEntry`, `InvalidCrc`
//! - **I/O**: `Io` (passed through from the write-ahead log)

use std::io;
use thiserror::Error;

/// Result type alias for EmberDB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the EmberDB engine
#[derive(Debug, Error)]
pub enum Error {
    /// Key not present in the targeted store
    #[error("invalid key")]
    InvalidKey,

    /// A non-positive TTL duration was supplied
    #[error("invalid ttl")]
    InvalidTtl,

    /// The key's TTL has elapsed
    #[error("key has expired")]
    ExpiredKey,

    /// Use of a transaction after commit or rollback
    #[error("tx closed")]
    TxClosed,

    /// Commit or write attempted on a read-only transaction
    #[error("tx not writable")]
    TxNotWritable,

    /// `begin` on an engine that has been closed
    #[error("database not open")]
    DatabaseClosed,

    /// A log record failed structural validation (empty key, short buffer,
    /// unknown type tag or op mark)
    #[error("invalid entry")]
    InvalidEntry,

    /// A log frame failed its checksum
    #[error("invalid crc")]
    InvalidCrc,

    /// I/O error from the underlying append-only log
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Check whether this error means "the key is simply absent".
    ///
    /// Covers both a key that never existed and one whose TTL elapsed.
    /// Callers that only care about presence treat these the same way.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::InvalidKey | Error::ExpiredKey)
    }

    /// Check whether this error indicates a corrupt log.
    ///
    /// Corruption aborts startup replay and should be surfaced, never retried.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::InvalidEntry | Error::InvalidCrc)
    }
}
