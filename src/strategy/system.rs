//! System allocator strategy.

use std::alloc::{GlobalAlloc, Layout, System};

use super::AllocationStrategy;

/// Default strategy backed by the platform allocator.
///
/// Goes through [`std::alloc::System`] directly rather than the
/// `std::alloc::alloc` free functions: those dispatch to the installed
/// `#[global_allocator]`, which may be this crate's own tracking hook.
/// Reaching the platform allocator underneath keeps the hook's strategy
/// calls from re-entering the hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStrategy;

impl SystemStrategy {
    /// Create a new system strategy.
    pub const fn new() -> Self {
        Self
    }
}

impl AllocationStrategy for SystemStrategy {
    fn allocate(&self, layout: Layout) -> *mut u8 {
        // SAFETY: the accounting layer never requests a zero-size layout.
        unsafe { System.alloc(layout) }
    }

    unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_round_trip() {
        let strategy = SystemStrategy::new();
        let layout = Layout::from_size_align(64, 8).unwrap();

        let ptr = strategy.allocate(layout);
        assert!(!ptr.is_null());

        unsafe {
            ptr.write_bytes(0xAB, 64);
            strategy.deallocate(ptr, layout);
        }
    }
}
