//! Pinned (page-locked) host memory pool.
//!
//! Pinned memory keeps a stable physical address, which device runtimes
//! require for DMA transfers. The pool hands out page-aligned, page-locked
//! buffers from a bounded byte budget and signals exhaustion by returning
//! `None`, never by failing. Dropping a pool buffer unlocks its pages and
//! returns the bytes to the budget.

use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::buffer::HostBuffer;

/// Source of pinned host buffers.
///
/// `try_allocate` must never panic or error for "pool exhausted": exhaustion
/// is an expected state, signaled by `None`, and distinct from a hard
/// failure. Implementations may block on internal contention but must not
/// block waiting for capacity.
pub trait PinnedPool: Send + Sync {
    /// Attempt to allocate `bytes` of pinned host memory.
    fn try_allocate(&self, bytes: usize) -> Option<HostBuffer>;
}

/// Reservation ledger shared between a pool and its outstanding buffers.
///
/// Buffers hold an `Arc` to the ledger so a dropped buffer can unlock its
/// pages and return its bytes even after the pool itself is gone.
pub(crate) struct PoolLedger {
    capacity: usize,
    used: AtomicUsize,
    lock_pages: bool,
    page_align: usize,
}

impl PoolLedger {
    /// Reserve `bytes` against the budget, or refuse without blocking.
    fn try_reserve(&self, bytes: usize) -> bool {
        let mut used = self.used.load(Ordering::Relaxed);
        loop {
            let Some(new_used) = used.checked_add(bytes) else {
                return false;
            };
            if new_used > self.capacity {
                return false;
            }
            match self.used.compare_exchange_weak(
                used,
                new_used,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(current) => used = current,
            }
        }
    }

    fn unreserve(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::Relaxed);
    }

    /// Return a buffer's memory: unlock its pages, free it, release budget.
    pub(crate) fn release(&self, ptr: *mut u8, len: usize) {
        if len == 0 {
            return;
        }
        if self.lock_pages {
            unlock_pages(ptr, len);
        }
        let layout = Layout::from_size_align(len, self.page_align).expect("valid layout");
        // Safety: allocated in `try_allocate` with this exact layout and
        // owned exclusively by the buffer being dropped.
        unsafe { dealloc(ptr, layout) }
        self.unreserve(len);
    }
}

/// A capacity-bounded pool of pinned host memory.
///
/// Cloning shares the underlying budget.
#[derive(Clone)]
pub struct PinnedMemoryPool {
    ledger: Arc<PoolLedger>,
}

impl PinnedMemoryPool {
    /// Create a pool with the given byte capacity, page-locking its memory.
    #[must_use]
    pub fn new(capacity_bytes: usize) -> Self {
        Self::with_locking(capacity_bytes, true)
    }

    /// Create a pool, choosing whether memory is actually page-locked.
    ///
    /// With `lock_pages` disabled the pool still enforces its budget and
    /// page alignment but skips the `mlock` call. Useful under tight
    /// `RLIMIT_MEMLOCK` limits and in tests.
    #[must_use]
    pub fn with_locking(capacity_bytes: usize, lock_pages: bool) -> Self {
        tracing::debug!(
            "pinned pool created: capacity {} bytes, lock_pages {}",
            capacity_bytes,
            lock_pages
        );
        Self {
            ledger: Arc::new(PoolLedger {
                capacity: capacity_bytes,
                used: AtomicUsize::new(0),
                lock_pages,
                page_align: page_size(),
            }),
        }
    }

    /// Total pool capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ledger.capacity
    }

    /// Bytes currently handed out.
    #[must_use]
    pub fn used(&self) -> usize {
        self.ledger.used.load(Ordering::Relaxed)
    }

    /// Bytes still available for allocation.
    #[must_use]
    pub fn available(&self) -> usize {
        self.capacity().saturating_sub(self.used())
    }
}

impl PinnedPool for PinnedMemoryPool {
    fn try_allocate(&self, bytes: usize) -> Option<HostBuffer> {
        // Zero-length requests are served by the pageable path.
        if bytes == 0 {
            return None;
        }
        if !self.ledger.try_reserve(bytes) {
            return None;
        }

        let Ok(layout) = Layout::from_size_align(bytes, self.ledger.page_align) else {
            self.ledger.unreserve(bytes);
            return None;
        };

        // Safety: `layout` has non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            self.ledger.unreserve(bytes);
            return None;
        };

        // A failed mlock (e.g. RLIMIT_MEMLOCK) counts as exhaustion: the
        // caller falls back to pageable memory.
        if self.ledger.lock_pages && !lock_pages(ptr.as_ptr(), bytes) {
            // Safety: just allocated with `layout`, not yet handed out.
            unsafe { dealloc(ptr.as_ptr(), layout) }
            self.ledger.unreserve(bytes);
            tracing::debug!("mlock of {} bytes failed, pinned request not served", bytes);
            return None;
        }

        Some(HostBuffer::pooled(ptr, bytes, Arc::clone(&self.ledger)))
    }
}

impl std::fmt::Debug for PinnedMemoryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedMemoryPool")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .field("lock_pages", &self.ledger.lock_pages)
            .finish()
    }
}

#[cfg(unix)]
fn page_size() -> usize {
    // Safety: sysconf has no memory-safety preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as usize } else { 4096 }
}

#[cfg(not(unix))]
fn page_size() -> usize {
    4096
}

#[cfg(unix)]
fn lock_pages(ptr: *const u8, len: usize) -> bool {
    // Safety: `ptr..ptr+len` is a live allocation owned by the caller.
    unsafe { libc::mlock(ptr.cast::<libc::c_void>(), len) == 0 }
}

#[cfg(unix)]
fn unlock_pages(ptr: *const u8, len: usize) {
    // Safety: the range was locked by `lock_pages` and is still allocated.
    let _ = unsafe { libc::munlock(ptr.cast::<libc::c_void>(), len) };
}

#[cfg(not(unix))]
fn lock_pages(_ptr: *const u8, _len: usize) -> bool {
    true
}

#[cfg(not(unix))]
fn unlock_pages(_ptr: *const u8, _len: usize) {}
