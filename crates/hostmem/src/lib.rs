//! # hostmem
//!
//! Pinned and pageable host-memory allocation for device staging.
//!
//! Callers request a byte count and a pinned-memory preference; the library
//! serves the request from a page-locked pool when preferred and possible,
//! otherwise from the process heap, and keeps diagnostic counters of how
//! much pageable memory has been handed out globally and per thread.
//!
//! ## Modules
//!
//! - [`memory`] - Buffers, the pinned pool, the allocator facade, accounting
//! - [`config`] - Allocator configuration
//! - [`utils`] - Errors and thread identity
//!
//! ## Example
//!
//! ```
//! use hostmem::{AllocConfig, DefaultHostAllocator, HostAllocator};
//!
//! let config = AllocConfig {
//!     pinned_capacity_bytes: 1 << 20,
//!     lock_pages: false,
//!     ..AllocConfig::default()
//! };
//! let allocator = DefaultHostAllocator::new(&config);
//!
//! let staging = allocator.allocate_with_preference(4096, true).unwrap();
//! assert_eq!(staging.len(), 4096);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod memory;
pub mod utils;

// Re-export commonly used types at crate root
pub use config::AllocConfig;
pub use memory::{
    AllocStats, AllocationTracker, AllocatorRegistry, DefaultHostAllocator, HostAllocator,
    HostBuffer, PinnedMemoryPool, PinnedPool, ThreadAlloc,
};
pub use utils::error::{Error, Result};
pub use utils::tid::current_tid;
