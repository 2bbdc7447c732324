//! End-to-end test with the tracking allocator installed process-wide.
//!
//! Lives in its own test binary: the installed global allocator affects
//! every allocation in the process, and the catch-all ledger assertions
//! need exclusive use of it (parallel tests would race the counters).

#![cfg(feature = "tracking")]

use std::alloc::Layout;

use domainalloc::{alloc_in, registry, Domain, TrackingAllocator, UNKNOWN};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator::new();

#[test]
fn test_global_hook_end_to_end() {
    registry::init();

    // Warm up any lazy one-time allocations (TLS, harness buffers) before
    // taking the baseline.
    drop(Box::new(0u64));

    let before_count = UNKNOWN.count();
    let before_bytes = UNKNOWN.bytes();

    // A plain Box never names a domain; the hook charges the catch-all.
    let block = Box::new([7u8; 512]);
    assert_eq!(UNKNOWN.count(), before_count + 1);
    assert_eq!(UNKNOWN.bytes(), before_bytes + 512);
    assert_eq!(block[511], 7);

    // The free site has no domain knowledge either; the owner is
    // recovered from the block's own header.
    drop(block);
    assert_eq!(UNKNOWN.count(), before_count);
    assert_eq!(UNKNOWN.bytes(), before_bytes);

    // Collection growth reallocates several times; every intermediate
    // buffer must be discharged from the same ledger it was charged to.
    let mut values: Vec<u64> = Vec::new();
    for i in 0..1000 {
        values.push(i);
    }
    assert!(UNKNOWN.bytes() > before_bytes);
    drop(values);
    assert_eq!(UNKNOWN.count(), before_count);
    assert_eq!(UNKNOWN.bytes(), before_bytes);

    // Explicitly routed hook allocations reach the platform allocator
    // underneath the installed hook; the strategy must not dispatch back
    // through `#[global_allocator]` and recurse.
    static NAMED: Domain = Domain::new("hook_named");
    let layout = Layout::from_size_align(256, 8).unwrap();
    let routed = alloc_in!(&NAMED, layout);
    assert!(!routed.is_null());
    assert_eq!(NAMED.count(), 1);
    assert_eq!(NAMED.bytes(), 256);
    assert_eq!(UNKNOWN.count(), before_count);
    unsafe { domainalloc::api::hook::deallocate(routed, layout) };
    assert_eq!(NAMED.count(), 0);

    // The report allocates internally while holding domain locks; the
    // suspension guard keeps that from deadlocking against the hook.
    let keep = Box::new(0u128);
    let text = registry::report_string();
    assert!(text.contains("unknown:"));
    assert!(text.contains("all_domains:"));
    drop(keep);
}
