//! Diagnostic snapshot types for allocation accounting.

use serde::{Deserialize, Serialize};

/// Bytes allocated by one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadAlloc {
    /// OS thread ID.
    pub tid: u64,
    /// Pageable bytes this thread has allocated.
    pub bytes: u64,
}

/// Point-in-time view of the allocation tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocStats {
    /// Total pageable bytes handed out since process start.
    pub total_pageable_bytes: u64,
    /// Highest value the total has reached.
    pub peak_pageable_bytes: u64,
    /// Last whole threshold step that was logged.
    pub last_logged_step: u64,
    /// Per-thread totals, sorted by thread ID.
    pub by_thread: Vec<ThreadAlloc>,
}

impl AllocStats {
    /// Total pageable allocation in GiB.
    #[must_use]
    pub fn total_gib(&self) -> f64 {
        gib(self.total_pageable_bytes)
    }
}

pub(crate) fn gib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gib_conversion() {
        assert!((gib(1 << 30) - 1.0).abs() < f64::EPSILON);
        assert!((gib(3 << 29) - 1.5).abs() < f64::EPSILON);
    }
}
