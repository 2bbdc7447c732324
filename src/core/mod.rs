//! Accounting core: headers, domain ledgers, registry.

#[cfg_attr(not(feature = "tracking"), allow(dead_code))]
pub mod header;

pub mod domain;
pub mod registry;
pub mod suspend;
