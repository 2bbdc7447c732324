//! Raw allocation strategies.
//!
//! A strategy is a pure byte source: it hands out and takes back raw
//! storage and knows nothing about headers or domains. The default wraps
//! the system allocator; pools or arenas can be substituted without
//! touching any of the accounting machinery.

mod system;

pub use system::SystemStrategy;

use std::alloc::Layout;

/// A pluggable source of raw bytes.
///
/// Implementations must be domain-agnostic: the accounting layer owns all
/// metadata placement and never expects a strategy to remember anything
/// about an allocation beyond what `Layout` encodes.
pub trait AllocationStrategy {
    /// Allocate raw storage for `layout`.
    ///
    /// Returns null on exhaustion. Failure is surfaced to the caller by
    /// the accounting layer; it is never retried here.
    fn allocate(&self, layout: Layout) -> *mut u8;

    /// Release raw storage previously returned by [`allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this strategy with
    /// the same `layout`, and must not have been released already.
    ///
    /// [`allocate`]: AllocationStrategy::allocate
    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout);
}
