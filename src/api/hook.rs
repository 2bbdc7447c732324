//! The process-wide tracking hook.
//!
//! [`TrackingAllocator`] implements [`GlobalAlloc`], so a host can route
//! *all* ordinary dynamic allocation through the accounting layer by
//! installing it deliberately at its composition root:
//!
//! ```rust,ignore
//! use domainalloc::TrackingAllocator;
//!
//! #[global_allocator]
//! static ALLOC: TrackingAllocator = TrackingAllocator::new();
//! ```
//!
//! Every block gets an extended header carrying provenance and a pointer
//! to its owning domain - by default the catch-all [`UNKNOWN`] domain.
//! The free path receives only a bare user pointer, recovers the header
//! by constant-offset arithmetic and dispatches the removal through the
//! stored domain pointer, so the freeing call site never needs to know
//! which domain the block was charged to.

use std::alloc::{GlobalAlloc, Layout};
use std::mem;
use std::ptr;

use crate::core::domain::Domain;
use crate::core::header::{SubHeader, SUB_HEADER_SIZE};
use crate::core::registry::UNKNOWN;
use crate::core::suspend;
use crate::strategy::{AllocationStrategy, SystemStrategy};
use crate::util::layout::{align_up, max_align};

/// Allocate through the hook, charging `domain`.
///
/// The `alloc_in!` macro wraps this with automatic `file!()`/`line!()`
/// capture.
#[macro_export]
macro_rules! alloc_in {
    ($domain:expr, $layout:expr) => {
        $crate::api::hook::allocate($domain, $layout, file!(), line!())
    };
}

/// Raw layout and header prefix for a hook allocation.
///
/// The prefix is `SUB_HEADER_SIZE` rounded up to the request's alignment,
/// so it is recomputable from the same `Layout` on the free path.
fn hook_layout(layout: Layout) -> Option<(Layout, usize)> {
    let prefix = align_up(SUB_HEADER_SIZE, layout.align());
    let size = layout.size().checked_add(prefix)?;
    let align = max_align(layout.align(), mem::align_of::<usize>());
    Layout::from_size_align(size, align)
        .ok()
        .map(|raw| (raw, prefix))
}

/// Allocate a block charged to `domain` through an explicit strategy.
///
/// Returns null on exhaustion; the failure is surfaced immediately,
/// never retried. While accounting is suspended on this thread the block
/// is served but left unaccounted.
pub fn allocate_in<S: AllocationStrategy>(
    domain: &'static Domain,
    strategy: &S,
    layout: Layout,
    file: &'static str,
    line: u32,
) -> *mut u8 {
    let Some((raw_layout, prefix)) = hook_layout(layout) else {
        return ptr::null_mut();
    };

    let raw = strategy.allocate(raw_layout);
    if raw.is_null() {
        return ptr::null_mut();
    }

    // SAFETY: the block is `prefix + payload` bytes and `prefix` is at
    // least SUB_HEADER_SIZE, so the header slot directly before the user
    // pointer is in bounds and word-aligned.
    unsafe {
        let user = raw.add(prefix);
        if SUB_HEADER_SIZE != 0 {
            let internal = user.sub(SUB_HEADER_SIZE);
            if suspend::is_suspended() {
                // Uniform free path: the block still gets a header, but a
                // null domain pointer marks it as unaccounted.
                (internal as *mut SubHeader).write(SubHeader::new(
                    layout.size(),
                    file,
                    line as usize,
                    ptr::null(),
                ));
            } else {
                domain.add_tracked(internal, layout.size(), file, line as usize);
            }
        }
        user
    }
}

/// Release a block allocated through the hook, via an explicit strategy.
///
/// Reads the owning domain out of the block's own header, so the caller
/// needs no knowledge of who was charged. Null is a no-op.
///
/// # Safety
///
/// `user` must have come from [`allocate_in`] (or the [`GlobalAlloc`]
/// impl) with the same strategy and `layout`, and must not have been
/// released already.
pub unsafe fn deallocate_with<S: AllocationStrategy>(strategy: &S, user: *mut u8, layout: Layout) {
    if user.is_null() {
        return;
    }
    let Some((raw_layout, prefix)) = hook_layout(layout) else {
        // The matching allocate succeeded, so this is unreachable for any
        // pointer honoring the safety contract.
        return;
    };

    if SUB_HEADER_SIZE != 0 {
        let sub = user.sub(SUB_HEADER_SIZE) as *mut SubHeader;
        let domain = (*sub).domain();
        if !domain.is_null() {
            (*domain).remove(sub as *mut u8);
        }
    }

    strategy.deallocate(user.sub(prefix), raw_layout);
}

/// [`allocate_in`] over the system strategy.
pub fn allocate(domain: &'static Domain, layout: Layout, file: &'static str, line: u32) -> *mut u8 {
    allocate_in(domain, &SystemStrategy, layout, file, line)
}

/// [`deallocate_with`] over the system strategy.
///
/// # Safety
///
/// Same contract as [`deallocate_with`].
pub unsafe fn deallocate(user: *mut u8, layout: Layout) {
    deallocate_with(&SystemStrategy, user, layout)
}

/// Drop-in global allocator that accounts every block to a domain.
///
/// Allocations that never name a domain are charged to the catch-all
/// [`UNKNOWN`] domain; frees recover the owner from the block's header.
pub struct TrackingAllocator<S: AllocationStrategy = SystemStrategy> {
    strategy: S,
}

impl TrackingAllocator<SystemStrategy> {
    /// Create a tracking allocator over the system strategy.
    pub const fn new() -> Self {
        Self {
            strategy: SystemStrategy::new(),
        }
    }
}

impl Default for TrackingAllocator<SystemStrategy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: AllocationStrategy> TrackingAllocator<S> {
    /// Create a tracking allocator over a custom strategy.
    pub const fn with_strategy(strategy: S) -> Self {
        Self { strategy }
    }
}

// SAFETY: blocks are carved out of the wrapped strategy with a layout
// derived deterministically from the request, so alloc/dealloc pair up
// exactly; the user pointer honors the requested alignment because the
// header prefix is a multiple of it.
unsafe impl<S: AllocationStrategy> GlobalAlloc for TrackingAllocator<S> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        allocate_in(&UNKNOWN, &self.strategy, layout, "<global>", 0)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        deallocate_with(&self.strategy, ptr, layout);
    }
}
