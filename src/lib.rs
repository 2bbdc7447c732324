//! # domainalloc
//!
//! Domain-tagged memory accounting with intrusive allocation headers.
//!
//! Every block obtained through this crate is prepended with a
//! fixed-layout header and linked into a named **domain** ledger that
//! tracks live allocation count and byte totals for one logical category
//! of the program. Metadata is recovered from a bare payload pointer by
//! constant-offset arithmetic - no side table, no per-allocation lookups.
//!
//! - Domains are plain `static`s wired into a reporting tree at startup
//! - Each domain has its own lock; distinct domains never contend
//! - A [`TrackingAllocator`] can be installed as the global allocator so
//!   memory that never names a domain still shows up, charged to the
//!   catch-all [`UNKNOWN`] domain
//! - Disabling the default `tracking` feature turns the whole layer into
//!   zero-cost no-ops with no caller-side changes
//!
//! ## Quick Start
//!
//! ```rust
//! use domainalloc::{registry, Domain, DomainAllocator};
//!
//! static PHYSICS: Domain = Domain::new("physics");
//!
//! registry::init();
//! PHYSICS.register(&domainalloc::ALL_DOMAINS);
//!
//! let alloc = DomainAllocator::new(&PHYSICS);
//! let ptr = alloc.allocate::<i32>(10).unwrap();
//! # #[cfg(feature = "tracking")]
//! assert_eq!(PHYSICS.count(), 1);
//! # #[cfg(feature = "tracking")]
//! assert_eq!(PHYSICS.bytes(), 40);
//!
//! unsafe { alloc.deallocate(ptr, 10) };
//! println!("{}", registry::report_string());
//! ```

pub mod api;
pub mod strategy;

mod core;
mod error;
#[cfg_attr(not(feature = "tracking"), allow(dead_code, unused_imports))]
mod sync;
mod util;

/// Domain registry: built-in domains, lookup and the diagnostic report.
pub mod registry {
    pub use crate::core::registry::{find, init, report, report_string};
}

pub use crate::core::domain::Domain;
pub use crate::core::header::{HEADER_SIZE, SUB_HEADER_SIZE};
pub use crate::core::registry::{ALL_DOMAINS, UNKNOWN};
pub use crate::core::suspend::{suspend_accounting, SuspendGuard};

pub use api::allocator::DomainAllocator;
pub use api::hook::TrackingAllocator;

pub use error::AllocError;
pub use strategy::{AllocationStrategy, SystemStrategy};

pub use util::size::format_bytes;
