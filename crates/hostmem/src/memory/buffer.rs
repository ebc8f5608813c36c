//! Host memory buffer handle.

use std::alloc::{Layout, dealloc};
use std::ptr::NonNull;
use std::sync::Arc;

use super::pinned::PoolLedger;

/// Alignment for pageable host allocations (one cache line).
pub(crate) const HOST_ALIGN: usize = 64;

/// Where a buffer's memory came from, and therefore how it is freed.
pub(crate) enum BufferOrigin {
    /// Zero-length buffer; nothing was allocated, nothing to free.
    Empty,
    /// System heap; freed through the global allocator.
    Heap,
    /// Pinned pool; pages are unlocked and the reservation returned on drop.
    Pool(Arc<PoolLedger>),
}

/// One host memory allocation.
///
/// A `HostBuffer` exclusively owns its memory. The memory is returned to its
/// origin (the system heap, or the pinned pool's budget) when the handle is
/// dropped; there is no separate release call. Buffer contents are
/// zero-initialized.
///
/// Whether the buffer is page-locked is visible through
/// [`is_pinned`](Self::is_pinned) for callers whose downstream transfer path
/// cares about the distinction.
pub struct HostBuffer {
    ptr: NonNull<u8>,
    len: usize,
    origin: BufferOrigin,
}

impl HostBuffer {
    /// Create a zero-length buffer. Allocates nothing.
    pub(crate) fn empty() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            origin: BufferOrigin::Empty,
        }
    }

    /// Wrap a heap allocation of `len` bytes aligned to [`HOST_ALIGN`].
    pub(crate) fn pageable(ptr: NonNull<u8>, len: usize) -> Self {
        Self {
            ptr,
            len,
            origin: BufferOrigin::Heap,
        }
    }

    /// Wrap a pool allocation of `len` bytes; `ledger` reclaims it on drop.
    pub(crate) fn pooled(ptr: NonNull<u8>, len: usize, ledger: Arc<PoolLedger>) -> Self {
        Self {
            ptr,
            len,
            origin: BufferOrigin::Pool(ledger),
        }
    }

    /// Length of the buffer in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is zero-length.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether this buffer's memory is page-locked (came from the pinned pool).
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        matches!(self.origin, BufferOrigin::Pool(_))
    }

    /// Base address of the buffer.
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Mutable base address of the buffer.
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// View the buffer contents as a byte slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // Safety: `ptr` is valid for `len` zero-initialized bytes for the
        // lifetime of `self`, and for `len == 0` it is a dangling but
        // aligned non-null pointer, which `from_raw_parts` permits.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// View the buffer contents as a mutable byte slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // Safety: as `as_slice`, plus `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

// Safety: the buffer exclusively owns its memory; the pointer is never
// aliased outside the accessors above, so moving the handle between threads
// and sharing `&HostBuffer` (read-only access) are both sound.
unsafe impl Send for HostBuffer {}
unsafe impl Sync for HostBuffer {}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        match &self.origin {
            BufferOrigin::Empty => {}
            BufferOrigin::Heap => {
                let layout =
                    Layout::from_size_align(self.len, HOST_ALIGN).expect("valid layout");
                // Safety: allocated in `raw::allocate_pageable` with this
                // exact layout, and owned exclusively by this handle.
                unsafe { dealloc(self.ptr.as_ptr(), layout) }
            }
            BufferOrigin::Pool(ledger) => ledger.release(self.ptr.as_ptr(), self.len),
        }
    }
}

impl std::fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("pinned", &self.is_pinned())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer() {
        let buffer = HostBuffer::empty();
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
        assert!(!buffer.is_pinned());
        assert_eq!(buffer.as_slice(), &[] as &[u8]);
    }

    #[test]
    fn test_pageable_buffer_read_write() {
        let mut buffer = crate::memory::allocate_pageable(128).unwrap();
        assert_eq!(buffer.len(), 128);
        assert!(!buffer.is_pinned());
        assert!(buffer.as_slice().iter().all(|&b| b == 0));

        buffer.as_mut_slice()[..4].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(&buffer.as_slice()[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_buffer_moves_across_threads() {
        let mut buffer = crate::memory::allocate_pageable(64).unwrap();
        buffer.as_mut_slice()[0] = 42;

        let handle = std::thread::spawn(move || buffer.as_slice()[0]);
        assert_eq!(handle.join().unwrap(), 42);
    }
}
