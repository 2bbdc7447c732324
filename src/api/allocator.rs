//! The allocator adaptor.
//!
//! Combines a raw [`AllocationStrategy`] with header placement and domain
//! registration behind a typed allocate/deallocate/construct/destroy
//! surface. Consumers (containers, smart pointers) only ever see user
//! pointers; the header before each payload belongs to the accounting
//! layer.

use std::alloc::Layout;
use std::mem;
use std::ptr;

use crate::core::domain::Domain;
use crate::core::header::HEADER_SIZE;
use crate::error::AllocError;
use crate::strategy::{AllocationStrategy, SystemStrategy};
use crate::util::layout::{align_up, max_align};

/// Layout of the raw `(header, payload)` block for `n` elements of `T`.
///
/// The prefix is `HEADER_SIZE` rounded up to `T`'s alignment, so the
/// header always sits at `user_ptr - HEADER_SIZE` and both offsets are
/// compile-time constants for a given `T`.
fn raw_layout<T>(n: usize) -> Result<(Layout, usize, usize), AllocError> {
    let payload = mem::size_of::<T>()
        .checked_mul(n)
        .ok_or(AllocError::SizeOverflow)?;
    let prefix = align_up(HEADER_SIZE, mem::align_of::<T>());
    let total = payload.checked_add(prefix).ok_or(AllocError::SizeOverflow)?;
    let align = max_align(mem::align_of::<T>(), mem::align_of::<usize>());
    let layout = Layout::from_size_align(total, align).map_err(|_| AllocError::SizeOverflow)?;
    Ok((layout, prefix, payload))
}

/// Typed allocator charging every block to one domain.
///
/// # Example
///
/// ```rust
/// use domainalloc::{Domain, DomainAllocator};
///
/// static MESHES: Domain = Domain::new("meshes");
///
/// let alloc = DomainAllocator::new(&MESHES);
/// let ptr = alloc.allocate::<f32>(256).unwrap();
/// # #[cfg(feature = "tracking")]
/// assert_eq!(MESHES.count(), 1);
/// unsafe { alloc.deallocate(ptr, 256) };
/// assert_eq!(MESHES.count(), 0);
/// ```
pub struct DomainAllocator<S: AllocationStrategy = SystemStrategy> {
    domain: &'static Domain,
    strategy: S,
}

impl DomainAllocator<SystemStrategy> {
    /// Create an adaptor over the system strategy.
    pub const fn new(domain: &'static Domain) -> Self {
        Self {
            domain,
            strategy: SystemStrategy::new(),
        }
    }
}

impl<S: AllocationStrategy> DomainAllocator<S> {
    /// Create an adaptor over a custom strategy.
    pub const fn with_strategy(domain: &'static Domain, strategy: S) -> Self {
        Self { domain, strategy }
    }

    /// The domain this adaptor charges.
    pub fn domain(&self) -> &'static Domain {
        self.domain
    }

    /// Allocate storage for `n` elements of `T` and charge the domain.
    ///
    /// `n == 0` (or a zero payload) is an explicit no-op: no strategy
    /// call, no domain mutation, `Ok(null)` returned. Strategy exhaustion
    /// surfaces as [`AllocError::OutOfMemory`] without retry.
    pub fn allocate<T>(&self, n: usize) -> Result<*mut T, AllocError> {
        let (layout, prefix, payload) = raw_layout::<T>(n)?;
        if payload == 0 {
            return Ok(ptr::null_mut());
        }

        let raw = self.strategy.allocate(layout);
        if raw.is_null() {
            return Err(AllocError::OutOfMemory(layout.size()));
        }

        // SAFETY: the block is `prefix + payload` bytes, so the user
        // pointer is in bounds and the header slot directly before it is
        // writable and word-aligned.
        unsafe {
            let user = raw.add(prefix);
            self.domain.add(user.sub(HEADER_SIZE), payload);
            Ok(user as *mut T)
        }
    }

    /// Release storage obtained from [`allocate`] with the same `n`.
    ///
    /// Null is a no-op.
    ///
    /// # Safety
    ///
    /// `user_ptr` must have come from `allocate::<T>(n)` on an adaptor
    /// with this domain and strategy configuration, and must not have
    /// been released already. Violations are undefined behavior; nothing
    /// on this path validates the pointer at runtime.
    ///
    /// [`allocate`]: DomainAllocator::allocate
    pub unsafe fn deallocate<T>(&self, user_ptr: *mut T, n: usize) {
        if user_ptr.is_null() {
            return;
        }
        // The matching allocate computed these exact values, so this
        // cannot fail for a pointer that honors the safety contract.
        let Ok((layout, prefix, payload)) = raw_layout::<T>(n) else {
            return;
        };
        if payload == 0 {
            return;
        }

        let user = user_ptr as *mut u8;
        self.domain.remove(user.sub(HEADER_SIZE));
        self.strategy.deallocate(user.sub(prefix), layout);
    }

    /// Construct a value in place. Domain-agnostic.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes and properly aligned for `T`.
    pub unsafe fn construct<T>(&self, ptr: *mut T, value: T) {
        ptr.write(value);
    }

    /// Drop a value in place. Domain-agnostic.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live, initialized `T`.
    pub unsafe fn destroy<T>(&self, ptr: *mut T) {
        ptr.drop_in_place();
    }

    /// Drop `n` consecutive values in place.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `n` live, initialized `T`s.
    pub unsafe fn destroy_slice<T>(&self, ptr: *mut T, n: usize) {
        for i in 0..n {
            ptr.add(i).drop_in_place();
        }
    }

    /// Allocate and initialize a single value.
    ///
    /// `T` must not be zero-sized.
    pub fn alloc_value<T>(&self, value: T) -> Result<*mut T, AllocError> {
        debug_assert!(mem::size_of::<T>() > 0, "alloc_value requires a sized payload");
        let ptr = self.allocate::<T>(1)?;
        // SAFETY: allocate(1) returned a valid block for one T.
        unsafe {
            self.construct(ptr, value);
        }
        Ok(ptr)
    }

    /// Drop and release a value from [`alloc_value`].
    ///
    /// # Safety
    ///
    /// `ptr` must have come from `alloc_value` on this adaptor
    /// configuration and not have been freed already.
    ///
    /// [`alloc_value`]: DomainAllocator::alloc_value
    pub unsafe fn free_value<T>(&self, ptr: *mut T) {
        if ptr.is_null() {
            return;
        }
        self.destroy(ptr);
        self.deallocate(ptr, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Strategy that counts calls and can be switched to fail.
    struct CountingStrategy {
        allocs: AtomicUsize,
        deallocs: AtomicUsize,
        fail: bool,
    }

    impl CountingStrategy {
        fn new(fail: bool) -> Self {
            Self {
                allocs: AtomicUsize::new(0),
                deallocs: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl AllocationStrategy for CountingStrategy {
        fn allocate(&self, layout: Layout) -> *mut u8 {
            self.allocs.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                ptr::null_mut()
            } else {
                SystemStrategy.allocate(layout)
            }
        }

        unsafe fn deallocate(&self, ptr: *mut u8, layout: Layout) {
            self.deallocs.fetch_add(1, Ordering::Relaxed);
            SystemStrategy.deallocate(ptr, layout);
        }
    }

    #[test]
    fn test_allocate_zero_is_a_no_op() {
        static DOM: Domain = Domain::new("alloc_zero");
        let strategy = CountingStrategy::new(false);
        let alloc = DomainAllocator::with_strategy(&DOM, strategy);

        let ptr = alloc.allocate::<u64>(0).unwrap();
        assert!(ptr.is_null());
        assert_eq!(alloc.strategy.allocs.load(Ordering::Relaxed), 0);
        assert_eq!(DOM.count(), 0);

        // Null deallocate is a no-op too.
        unsafe { alloc.deallocate::<u64>(ptr, 0) };
        assert_eq!(alloc.strategy.deallocs.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_strategy_exhaustion_surfaces_immediately() {
        static DOM: Domain = Domain::new("alloc_oom");
        let strategy = CountingStrategy::new(true);
        let alloc = DomainAllocator::with_strategy(&DOM, strategy);

        let err = alloc.allocate::<u64>(4).unwrap_err();
        assert!(matches!(err, AllocError::OutOfMemory(_)));
        // Exactly one attempt, no retry, no ledger mutation.
        assert_eq!(alloc.strategy.allocs.load(Ordering::Relaxed), 1);
        assert_eq!(DOM.count(), 0);
        assert_eq!(DOM.bytes(), 0);
    }

    #[test]
    fn test_count_overflow_is_rejected() {
        static DOM: Domain = Domain::new("alloc_overflow");
        let alloc = DomainAllocator::new(&DOM);

        let err = alloc.allocate::<u64>(usize::MAX).unwrap_err();
        assert_eq!(err, AllocError::SizeOverflow);
        assert_eq!(DOM.count(), 0);
    }

    #[test]
    fn test_construct_and_destroy_round_trip() {
        static DOM: Domain = Domain::new("alloc_construct");
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Probe(u32);
        impl Drop for Probe {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::Relaxed);
            }
        }

        let alloc = DomainAllocator::new(&DOM);
        let ptr = alloc.alloc_value(Probe(7)).unwrap();
        assert_eq!(unsafe { (*ptr).0 }, 7);

        unsafe { alloc.free_value(ptr) };
        assert_eq!(DROPS.load(Ordering::Relaxed), 1);
        assert_eq!(DOM.count(), 0);
    }

    #[test]
    fn test_high_alignment_payload() {
        #[repr(align(64))]
        struct Aligned([u8; 64]);

        static DOM: Domain = Domain::new("alloc_aligned");
        let alloc = DomainAllocator::new(&DOM);

        let ptr = alloc.allocate::<Aligned>(3).unwrap();
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % 64, 0);

        unsafe { alloc.deallocate(ptr, 3) };
        assert_eq!(DOM.count(), 0);
        assert_eq!(DOM.bytes(), 0);
    }
}
