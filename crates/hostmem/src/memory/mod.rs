//! Host-memory allocation: pinned pool, pageable fallback, accounting.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   DefaultHostAllocator                      │
//! │                                                             │
//! │  prefer_pinned ──► PinnedMemoryPool ──hit──► pinned buffer  │
//! │        │                  │                                 │
//! │        │ no              miss                               │
//! │        ▼                  ▼                                 │
//! │    system heap ◄──────────┘                                 │
//! │        │                                                    │
//! │        ├──► AllocationTracker (global / per-thread totals)  │
//! │        ▼                                                    │
//! │    pageable buffer                                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pinned-pool exhaustion is not an error: the request silently falls back
//! to pageable memory. Only the pageable path is tracked here; pinned
//! accounting is owned by the pool.

mod allocator;
mod buffer;
mod pinned;
mod raw;
mod registry;
mod stats;
mod tracker;

pub use allocator::{DefaultHostAllocator, HostAllocator};
pub use buffer::HostBuffer;
pub use pinned::{PinnedMemoryPool, PinnedPool};
pub use raw::allocate_pageable;
pub use registry::AllocatorRegistry;
pub use stats::{AllocStats, ThreadAlloc};
pub use tracker::{AllocationTracker, DEFAULT_LOG_STEP_BYTES};
