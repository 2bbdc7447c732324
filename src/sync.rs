//! Lock selection for domain ledgers.
//!
//! Every tracked allocate and deallocate takes exactly one ledger lock,
//! so the mutex implementation sits on the hot path. The `parking_lot`
//! feature swaps in its mutex; the default wraps `std::sync::Mutex` with
//! the same minimal surface (`const new` + `lock`).
//!
//! A poisoned std mutex means a panic happened mid-mutation of a ledger,
//! whose counters and list links are then unreliable; continuing would
//! corrupt accounting silently, so `lock` treats poisoning as fatal.

#[cfg(feature = "parking_lot")]
pub use parking_lot::Mutex;

#[cfg(not(feature = "parking_lot"))]
pub use fallback::Mutex;

#[cfg(not(feature = "parking_lot"))]
mod fallback {
    use std::ops::{Deref, DerefMut};
    use std::sync::{self, MutexGuard as StdGuard};

    /// `std::sync::Mutex` behind the `parking_lot`-shaped surface.
    pub struct Mutex<T> {
        inner: sync::Mutex<T>,
    }

    impl<T> Mutex<T> {
        pub const fn new(value: T) -> Self {
            Self {
                inner: sync::Mutex::new(value),
            }
        }

        pub fn lock(&self) -> Guard<'_, T> {
            Guard {
                inner: self.inner.lock().expect("ledger mutex poisoned"),
            }
        }
    }

    /// Guard matching `parking_lot::MutexGuard`'s deref surface.
    pub struct Guard<'a, T> {
        inner: StdGuard<'a, T>,
    }

    impl<T> Deref for Guard<'_, T> {
        type Target = T;

        fn deref(&self) -> &T {
            &self.inner
        }
    }

    impl<T> DerefMut for Guard<'_, T> {
        fn deref_mut(&mut self) -> &mut T {
            &mut self.inner
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Mutex;

    #[test]
    fn test_lock_round_trip() {
        static SHARED: Mutex<usize> = Mutex::new(0);

        *SHARED.lock() += 3;
        assert_eq!(*SHARED.lock(), 3);
    }
}
