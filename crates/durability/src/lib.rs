//! Durability layer for EmberDB: a segmented append-only log.
//!
//! The engine journals every committed mutation here before applying it to
//! the in-memory stores, and replays the whole log on startup. See
//! [`wal::Wal`] for the facade the engine consumes.

pub mod wal;

pub use wal::{SyncPolicy, Wal, WalConfig, WalError};
