//! Wall-clock helpers.
//!
//! All TTL arithmetic works in whole unix seconds; record write timestamps
//! use nanoseconds.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall clock as unix seconds.
pub fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Current wall clock as unix nanoseconds.
pub fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
