//! Per-thread accounting suspension.
//!
//! The diagnostic report writes through `io` machinery that may itself
//! allocate while a domain lock is held. If the global hook is installed,
//! such an allocation would re-enter the ledger being printed and
//! deadlock on its mutex. While the flag is set, the hook still serves
//! memory but leaves the block unaccounted (null owning-domain pointer),
//! so the matching free skips ledger mutation as well.

use std::cell::Cell;

thread_local! {
    static SUSPENDED: Cell<bool> = const { Cell::new(false) };
}

/// RAII guard restoring the previous suspension state on drop.
///
/// Nesting is fine; each guard restores what it saw.
pub struct SuspendGuard {
    prev: bool,
}

/// Suspend allocation accounting on the current thread.
///
/// Blocks allocated through the global hook while the returned guard is
/// alive are served normally but charged to no domain.
pub fn suspend_accounting() -> SuspendGuard {
    let prev = SUSPENDED.with(|flag| flag.replace(true));
    SuspendGuard { prev }
}

/// Whether accounting is currently suspended on this thread.
pub(crate) fn is_suspended() -> bool {
    SUSPENDED.with(|flag| flag.get())
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        SUSPENDED.with(|flag| flag.set(self.prev));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_restores_state() {
        assert!(!is_suspended());
        {
            let _outer = suspend_accounting();
            assert!(is_suspended());
            {
                let _inner = suspend_accounting();
                assert!(is_suspended());
            }
            assert!(is_suspended());
        }
        assert!(!is_suspended());
    }
}
