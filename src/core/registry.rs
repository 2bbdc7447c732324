//! Domain registry and tree reporting.
//!
//! Domains are plain `static` data records wired into the tree at process
//! start (or on first registration), which gives a defined initialization
//! order with none of the lazy-singleton hazards. The registry keeps a
//! flat list of everything registered for lookup, plus the built-in root
//! and catch-all domains.

use std::io::{self, Write};

use crate::core::domain::Domain;
#[cfg(feature = "tracking")]
use crate::core::suspend;
#[cfg(feature = "tracking")]
use crate::sync::Mutex;

/// Root of the domain tree.
pub static ALL_DOMAINS: Domain = Domain::new("all_domains");

/// Catch-all owner for allocations not explicitly routed to a domain.
///
/// The global hook charges everything here unless the call site named a
/// domain itself.
pub static UNKNOWN: Domain = Domain::new("unknown");

#[cfg(feature = "tracking")]
static REGISTERED: Mutex<Vec<&'static Domain>> = Mutex::new(Vec::new());

static INIT: std::sync::Once = std::sync::Once::new();

/// Wire the built-in domains into the tree.
///
/// Call once from the composition root. Safe to call repeatedly or
/// concurrently; only the first call does anything. [`report`] calls this
/// itself, so a host that never allocates before reporting can skip it.
pub fn init() {
    INIT.call_once(|| {
        #[cfg(feature = "tracking")]
        record(&ALL_DOMAINS);
        UNKNOWN.register(&ALL_DOMAINS);
    });
}

/// Record a domain in the flat registry list.
#[cfg(feature = "tracking")]
pub(crate) fn record(domain: &'static Domain) {
    REGISTERED.lock().push(domain);
}

/// Look up a registered domain by name.
pub fn find(name: &str) -> Option<&'static Domain> {
    init();

    #[cfg(feature = "tracking")]
    {
        REGISTERED.lock().iter().copied().find(|d| d.name() == name)
    }

    #[cfg(not(feature = "tracking"))]
    {
        let _ = name;
        None
    }
}

/// Write the diagnostic report: every registered domain's name, live
/// count and live byte total, indented by tree depth.
///
/// Counts and hierarchy are exact; the surrounding text is not a
/// compatibility surface. With tracking disabled this writes nothing.
pub fn report(out: &mut dyn Write) -> io::Result<()> {
    init();

    #[cfg(feature = "tracking")]
    {
        let _guard = suspend::suspend_accounting();
        writeln!(out, "== domain memory report ==")?;
        ALL_DOMAINS.print(out, 0)?;
        writeln!(out, "==========================")?;
    }

    #[cfg(not(feature = "tracking"))]
    let _ = out;

    Ok(())
}

/// The diagnostic report as a `String`.
pub fn report_string() -> String {
    let mut out = Vec::new();
    // Writing to a Vec cannot fail.
    report(&mut out).expect("report to Vec failed");
    String::from_utf8_lossy(&out).into_owned()
}
