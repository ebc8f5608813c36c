//! End-to-end allocator behavior, including cross-thread accounting.

use std::sync::Arc;

use hostmem::{
    AllocConfig, AllocatorRegistry, DefaultHostAllocator, HostAllocator, PinnedMemoryPool,
    PinnedPool, current_tid,
};

fn pageable_only_config() -> AllocConfig {
    AllocConfig {
        lock_pages: false,
        ..AllocConfig::default()
    }
}

#[test]
fn concurrent_fallback_allocations_sum_exactly() {
    let allocator = Arc::new(DefaultHostAllocator::new(&pageable_only_config()));
    let sizes: &[usize] = &[64, 256, 1024, 4096];

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let allocator = Arc::clone(&allocator);
            std::thread::spawn(move || {
                let mut buffers = Vec::new();
                let mut my_bytes = 0u64;
                for _ in 0..50 {
                    let size = sizes[t % sizes.len()];
                    buffers.push(allocator.allocate_with_preference(size, false).unwrap());
                    my_bytes += size as u64;
                }
                // Per-thread attribution matches what this thread asked for.
                assert_eq!(
                    allocator.tracker().allocated_by_thread(current_tid()),
                    my_bytes
                );
                my_bytes
            })
        })
        .collect();

    let expected: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(allocator.tracker().total_allocated(), expected);
    assert_eq!(allocator.tracker().thread_count(), 4);
}

#[test]
fn pinned_requests_bypass_pageable_accounting() {
    let config = AllocConfig {
        prefer_pinned: true,
        pinned_capacity_bytes: 1 << 20,
        lock_pages: false,
        ..AllocConfig::default()
    };
    let allocator = DefaultHostAllocator::new(&config);

    let pinned = allocator.allocate(8192).unwrap();
    assert!(pinned.is_pinned());
    assert_eq!(allocator.tracker().total_allocated(), 0);

    // Exhaust the pool; the next request silently falls back and is tracked.
    let hog = allocator.allocate((1 << 20) - 8192).unwrap();
    assert!(hog.is_pinned());
    let fallback = allocator.allocate(4096).unwrap();
    assert!(!fallback.is_pinned());
    assert_eq!(allocator.tracker().total_allocated(), 4096);
}

#[test]
fn threshold_crossings_are_observed() {
    let config = AllocConfig {
        lock_pages: false,
        log_threshold_bytes: 1024,
        ..AllocConfig::default()
    };
    let allocator = DefaultHostAllocator::new(&config);

    let mut buffers = Vec::new();
    for _ in 0..3 {
        buffers.push(allocator.allocate(1024).unwrap());
    }
    assert_eq!(allocator.tracker().total_allocated(), 3072);
    assert!(allocator.tracker().last_logged_step() >= 2);
}

#[test]
fn registry_swap_is_visible_immediately() {
    let registry = AllocatorRegistry::new(Arc::new(DefaultHostAllocator::new(
        &pageable_only_config(),
    )));

    let replacement: Arc<dyn HostAllocator> = Arc::new(DefaultHostAllocator::new(
        &AllocConfig::with_pinned_capacity(1 << 20),
    ));
    registry.set(Arc::clone(&replacement));
    assert!(Arc::ptr_eq(&registry.get(), &replacement));

    // The installed allocator serves requests as configured.
    let buffer = registry.get().allocate(64).unwrap();
    assert_eq!(buffer.len(), 64);
}

#[test]
fn buffers_are_usable_and_independent() {
    let pool = PinnedMemoryPool::with_locking(1 << 16, false);
    let allocator = DefaultHostAllocator::new(&pageable_only_config());

    let mut pinned = pool.try_allocate(512).unwrap();
    let mut pageable = allocator.allocate(512).unwrap();

    pinned.as_mut_slice().fill(0x11);
    pageable.as_mut_slice().fill(0x22);

    assert!(pinned.as_slice().iter().all(|&b| b == 0x11));
    assert!(pageable.as_slice().iter().all(|&b| b == 0x22));
}
