//! Benchmarks comparing tracked allocation against the bare system path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use domainalloc::{Domain, DomainAllocator};
use std::alloc::{alloc, dealloc, Layout};

static BENCH: Domain = Domain::new("bench");

fn bench_alloc_cycle(c: &mut Criterion) {
    let tracked = DomainAllocator::new(&BENCH);

    c.bench_function("domain_alloc_dealloc_64b", |b| {
        b.iter(|| {
            let ptr = tracked.allocate::<[u8; 64]>(1).unwrap();
            black_box(ptr);
            unsafe { tracked.deallocate(ptr, 1) };
        })
    });

    c.bench_function("system_alloc_dealloc_64b", |b| {
        let layout = Layout::from_size_align(64, 8).unwrap();
        b.iter(|| unsafe {
            let ptr = alloc(layout);
            black_box(ptr);
            dealloc(ptr, layout);
        })
    });

    c.bench_function("domain_alloc_dealloc_4kb", |b| {
        b.iter(|| {
            let ptr = tracked.allocate::<[u8; 4096]>(1).unwrap();
            black_box(ptr);
            unsafe { tracked.deallocate(ptr, 1) };
        })
    });
}

criterion_group!(benches, bench_alloc_cycle);
criterion_main!(benches);
