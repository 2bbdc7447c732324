//! Internal utilities.

pub mod layout;
pub mod size;
