//! Segmented append-only log.
//!
//! The engine consumes this module through a narrow contract: `append`,
//! `append_batch`, `segments`, `read(segment, entry)`, and `close`. The
//! implementation keeps a directory of immutable numbered segment files
//! plus one active tail segment, rotating by size.

pub mod config;
pub mod frame;
pub mod log;
pub mod segment;

pub use config::WalConfig;
pub use log::Wal;
pub use segment::{SegmentHeader, WalSegment, SEGMENT_HEADER_SIZE};

use ember_core::Error;
use std::io;
use thiserror::Error as ThisError;

/// When the log fsyncs after an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// fsync after every append or batch. Zero data-loss window.
    Always,
    /// Never fsync on append; the OS flushes on its own schedule. Faster,
    /// risks the tail of the log on a crash.
    Never,
}

impl SyncPolicy {
    /// Derive the policy from the engine's `no_sync` flag.
    pub fn from_no_sync(no_sync: bool) -> Self {
        if no_sync {
            SyncPolicy::Never
        } else {
            SyncPolicy::Always
        }
    }

    /// Whether appends must fsync before returning.
    pub fn requires_fsync(self) -> bool {
        matches!(self, SyncPolicy::Always)
    }
}

/// Errors from the append-only log.
#[derive(Debug, ThisError)]
pub enum WalError {
    /// The read cursor has passed the last entry of the segment.
    #[error("end of segment")]
    Eof,

    /// A fully-read frame failed its checksum.
    #[error("invalid frame checksum")]
    InvalidCrc,

    /// Request for a segment index the log does not have.
    #[error("segment not found: {0}")]
    SegmentNotFound(u64),

    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Lossless conversion into the engine's error taxonomy.
///
/// `Eof` is a control-flow signal the engine handles before converting; if
/// one does leak through, it surfaces as an unexpected-EOF I/O error rather
/// than being silently swallowed.
impl From<WalError> for Error {
    fn from(e: WalError) -> Self {
        match e {
            WalError::Eof => Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "unexpected end of log segment",
            )),
            WalError::InvalidCrc => Error::InvalidCrc,
            WalError::SegmentNotFound(n) => Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("log segment {} not found", n),
            )),
            WalError::Io(e) => Error::Io(e),
        }
    }
}
