//! Error types for host-memory allocation.

use thiserror::Error;

/// Errors produced by host-memory allocation.
#[derive(Debug, Error)]
pub enum Error {
    /// The system heap could not satisfy the request.
    ///
    /// This is fatal for the allocation attempt; it is not retried and there
    /// is no further fallback.
    #[error("out of host memory: failed to allocate {requested} bytes")]
    OutOfHostMemory {
        /// Number of bytes that was requested.
        requested: usize,
    },

    /// The requested size cannot form a valid memory layout.
    #[error("invalid allocation size: {requested} bytes")]
    InvalidSize {
        /// Number of bytes that was requested.
        requested: usize,
    },
}

/// Result type alias for hostmem operations.
pub type Result<T> = std::result::Result<T, Error>;
