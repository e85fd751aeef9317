//! WAL configuration.

/// Configuration for the segmented append-only log.
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Maximum segment size in bytes (default: 64 MiB).
    ///
    /// When an append would push the active segment past this size, a new
    /// segment is created first.
    pub segment_size: u64,
}

impl Default for WalConfig {
    fn default() -> Self {
        WalConfig {
            segment_size: 64 * 1024 * 1024,
        }
    }
}

impl WalConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the segment size (builder pattern).
    pub fn with_segment_size(mut self, size: u64) -> Self {
        self.segment_size = size;
        self
    }

    /// A configuration with tiny segments, to exercise rotation in tests.
    pub fn for_testing() -> Self {
        WalConfig { segment_size: 512 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        assert_eq!(WalConfig::default().segment_size, 64 * 1024 * 1024);
    }

    #[test]
    fn test_builder() {
        let cfg = WalConfig::new().with_segment_size(4096);
        assert_eq!(cfg.segment_size, 4096);
    }
}
