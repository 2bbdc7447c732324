//! Build script for domainalloc.
//!
//! Emits configuration notes for feature combinations that change the
//! accounting behavior in ways worth knowing about at build time.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_TRACKING");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PARKING_LOT");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_LOG");

    let tracking = env::var("CARGO_FEATURE_TRACKING").is_ok();
    let parking_lot = env::var("CARGO_FEATURE_PARKING_LOT").is_ok();
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    if !tracking {
        note("accounting disabled: domain operations are no-ops and header sizes are zero");
        note("re-enable with the default 'tracking' feature");
    }

    if tracking && profile == "release" && !parking_lot {
        note("tip: the 'parking_lot' feature speeds up contended domain ledgers");
    }
}

fn note(msg: &str) {
    println!("cargo:warning=[domainalloc] {}", msg);
}
