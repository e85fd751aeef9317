//! Typed in-memory stores for EmberDB.
//!
//! Four independent containers — strings, hashes, sets, sorted sets — each
//! guarded by its own reader/writer lock, plus the shared expiry map they
//! all consult. The containers know nothing about transactions or the
//! write-ahead log; the engine crate applies committed records to them and
//! background sweepers call [`Store::evict`] on a timer.

pub mod expiry;
pub mod hashes;
pub mod sets;
pub mod strings;
pub mod zsets;

pub use expiry::ExpiryMap;
pub use hashes::HashStore;
pub use sets::SetStore;
pub use strings::StrStore;
pub use zsets::ZSetStore;

use ember_core::DataType;

/// The one capability every typed store shares: dropping its expired keys.
///
/// `evict` takes the store's own write lock, scans the live keys, and
/// removes any whose deadline in the expiry map has passed — clearing the
/// deadline entry as well. It never touches the write-ahead log; replayed
/// expire records reproduce the deletions on restart.
pub trait Store: Send + Sync {
    /// Which expiry-map partition this store consults.
    fn data_type(&self) -> DataType;

    /// Remove every key whose deadline has elapsed.
    fn evict(&self, expiry: &ExpiryMap);
}
