//! Pageable allocation from the system heap.

use std::alloc::{Layout, alloc_zeroed};
use std::ptr::NonNull;

use crate::utils::error::{Error, Result};

use super::buffer::{HOST_ALIGN, HostBuffer};

/// Allocate `bytes` of pageable (ordinary, not page-locked) host memory.
///
/// Zero-length requests succeed without touching the system allocator. A
/// null return from the system allocator surfaces as
/// [`Error::OutOfHostMemory`]; there is no retry and no further fallback.
pub fn allocate_pageable(bytes: usize) -> Result<HostBuffer> {
    if bytes == 0 {
        return Ok(HostBuffer::empty());
    }

    let layout = Layout::from_size_align(bytes, HOST_ALIGN)
        .map_err(|_| Error::InvalidSize { requested: bytes })?;

    // Safety: `layout` has non-zero size.
    let ptr = unsafe { alloc_zeroed(layout) };

    match NonNull::new(ptr) {
        Some(ptr) => Ok(HostBuffer::pageable(ptr, bytes)),
        None => Err(Error::OutOfHostMemory { requested: bytes }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length_allocation() {
        let buffer = allocate_pageable(0).unwrap();
        assert!(buffer.is_empty());
        assert!(!buffer.is_pinned());
    }

    #[test]
    fn test_small_allocation() {
        let buffer = allocate_pageable(4096).unwrap();
        assert_eq!(buffer.len(), 4096);
    }

    #[test]
    fn test_unrepresentable_size_is_rejected() {
        let err = allocate_pageable(usize::MAX).unwrap_err();
        assert!(matches!(err, Error::InvalidSize { requested } if requested == usize::MAX));
    }
}
