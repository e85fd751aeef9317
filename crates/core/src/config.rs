//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bind address for an optional network front-end.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";

/// Default directory for the append-only log segments.
pub const DEFAULT_PATH: &str = "/tmp/emberdb";

/// Engine configuration.
///
/// The struct derives serde so a host process can embed it in its own
/// configuration file; the engine itself never reads config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bind address for an optional network front-end. Unused by the engine
    /// itself, carried for hosts that expose one.
    pub addr: String,

    /// Directory for append-only log segments. An empty path disables
    /// persistence entirely: no log, no startup replay, no write-ahead step.
    pub path: String,

    /// Background sweep interval in whole seconds. Zero disables the
    /// sweeper pool; lazy check-on-access eviction still applies.
    pub eviction_interval: u64,

    /// Disable fsync after log writes. Faster, but puts the tail of the log
    /// at risk on a crash.
    pub no_sync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: DEFAULT_ADDR.to_string(),
            path: DEFAULT_PATH.to_string(),
            eviction_interval: 1,
            no_sync: false,
        }
    }
}

impl Config {
    /// A config with persistence and background sweeping disabled.
    /// Useful for caches and tests.
    pub fn in_memory() -> Self {
        Config {
            path: String::new(),
            eviction_interval: 0,
            ..Config::default()
        }
    }

    /// Fill in defaults for fields left empty.
    pub fn validate(&mut self) {
        if self.addr.is_empty() {
            self.addr = DEFAULT_ADDR.to_string();
        }
    }

    /// Whether a write-ahead log is configured.
    pub fn persistence_enabled(&self) -> bool {
        !self.path.is_empty()
    }

    /// Sweep interval as a duration.
    pub fn eviction_period(&self) -> Duration {
        Duration::from_secs(self.eviction_interval)
    }
}
