//! Host allocator facade.

use std::sync::Arc;

use crate::config::AllocConfig;
use crate::utils::error::Result;
use crate::utils::tid::current_tid;

use super::buffer::HostBuffer;
use super::pinned::{PinnedMemoryPool, PinnedPool};
use super::raw::allocate_pageable;
use super::stats::AllocStats;
use super::tracker::AllocationTracker;

/// Hands out host memory buffers.
///
/// `prefer_pinned` is a hint, not a guarantee: an allocator may serve a
/// pinned request from pageable memory when pinned memory is unavailable.
/// The returned buffer's [`HostBuffer::is_pinned`] tells the truth.
pub trait HostAllocator: Send + Sync {
    /// Allocate `bytes` of host memory, preferring pinned memory or not.
    fn allocate_with_preference(&self, bytes: usize, prefer_pinned: bool) -> Result<HostBuffer>;

    /// Allocate `bytes` of host memory with the configured default
    /// preference.
    fn allocate(&self, bytes: usize) -> Result<HostBuffer>;
}

/// Default host allocator: pinned pool first when preferred, tracked
/// pageable fallback otherwise.
///
/// Pinned allocations are accounted for by the pool, not here; the tracker
/// only sees the pageable path. A failed pageable allocation is surfaced
/// unmodified and leaves the tracker untouched.
pub struct DefaultHostAllocator {
    pool: Arc<dyn PinnedPool>,
    tracker: Arc<AllocationTracker>,
    prefer_pinned: bool,
}

impl DefaultHostAllocator {
    /// Create an allocator from a configuration, building its own pinned
    /// pool.
    #[must_use]
    pub fn new(config: &AllocConfig) -> Self {
        let pool = PinnedMemoryPool::with_locking(config.pinned_capacity_bytes, config.lock_pages);
        Self::with_pool(Arc::new(pool), config)
    }

    /// Create an allocator around an existing pool.
    #[must_use]
    pub fn with_pool(pool: Arc<dyn PinnedPool>, config: &AllocConfig) -> Self {
        Self {
            pool,
            tracker: Arc::new(AllocationTracker::new(config.log_threshold_bytes)),
            prefer_pinned: config.prefer_pinned,
        }
    }

    /// The tracker accounting this allocator's pageable path.
    #[must_use]
    pub fn tracker(&self) -> &AllocationTracker {
        &self.tracker
    }

    /// Point-in-time view of the pageable accounting.
    #[must_use]
    pub fn stats(&self) -> AllocStats {
        self.tracker.snapshot()
    }
}

impl HostAllocator for DefaultHostAllocator {
    fn allocate_with_preference(&self, bytes: usize, prefer_pinned: bool) -> Result<HostBuffer> {
        if prefer_pinned {
            if let Some(buffer) = self.pool.try_allocate(bytes) {
                // Pinned accounting belongs to the pool.
                return Ok(buffer);
            }
        }

        let buffer = allocate_pageable(bytes)?;
        self.tracker.record(current_tid(), bytes as u64);
        Ok(buffer)
    }

    fn allocate(&self, bytes: usize) -> Result<HostBuffer> {
        self.allocate_with_preference(bytes, self.prefer_pinned)
    }
}

impl Default for DefaultHostAllocator {
    fn default() -> Self {
        Self::new(&AllocConfig::default())
    }
}

impl std::fmt::Debug for DefaultHostAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultHostAllocator")
            .field("prefer_pinned", &self.prefer_pinned)
            .field("tracker", &self.tracker)
            .finish()
    }
}
