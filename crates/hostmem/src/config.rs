//! Allocator configuration.

use serde::{Deserialize, Serialize};

use crate::memory::DEFAULT_LOG_STEP_BYTES;

/// Configuration for [`DefaultHostAllocator`](crate::DefaultHostAllocator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocConfig {
    /// Default preference applied by the short-form `allocate`.
    pub prefer_pinned: bool,
    /// Pinned pool capacity in bytes; 0 disables the pool, so every request
    /// is served from pageable memory.
    pub pinned_capacity_bytes: usize,
    /// Whether the pinned pool actually page-locks its memory with `mlock`.
    pub lock_pages: bool,
    /// Cumulative pageable bytes between diagnostic log lines; 0 disables
    /// threshold logging.
    pub log_threshold_bytes: u64,
}

impl Default for AllocConfig {
    fn default() -> Self {
        Self {
            prefer_pinned: false,
            pinned_capacity_bytes: 0,
            lock_pages: true,
            log_threshold_bytes: DEFAULT_LOG_STEP_BYTES,
        }
    }
}

impl AllocConfig {
    /// Configuration with a pinned pool of `bytes` capacity and pinned
    /// memory preferred by default.
    #[must_use]
    pub fn with_pinned_capacity(bytes: usize) -> Self {
        Self {
            prefer_pinned: true,
            pinned_capacity_bytes: bytes,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AllocConfig::default();
        assert!(!config.prefer_pinned);
        assert_eq!(config.pinned_capacity_bytes, 0);
        assert!(config.lock_pages);
        assert_eq!(config.log_threshold_bytes, 1 << 30);
    }

    #[test]
    fn test_pinned_capacity_config() {
        let config = AllocConfig::with_pinned_capacity(1 << 20);
        assert!(config.prefer_pinned);
        assert_eq!(config.pinned_capacity_bytes, 1 << 20);
    }
}
