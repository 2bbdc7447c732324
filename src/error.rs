//! Error types for domainalloc.

use thiserror::Error;

/// Failure of an allocation request.
///
/// These are the only runtime-checked failures on the allocation path.
/// Exhaustion is surfaced once and never retried; freeing an invalid
/// pointer is a safety-contract violation, not a detectable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The strategy returned null for a request of this many raw bytes.
    #[error("allocation of {0} bytes failed")]
    OutOfMemory(usize),

    /// The requested element count overflows the addressable size.
    #[error("allocation size overflows usize")]
    SizeOverflow,
}
