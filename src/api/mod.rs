//! Public allocation surface.

pub mod allocator;
pub mod hook;
