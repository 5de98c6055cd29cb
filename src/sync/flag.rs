//! Non-blocking test-and-set resource flags

use std::sync::{Mutex, MutexGuard};

/// A two-state lock over a single in-process resource.
///
/// [`ResourceFlag::try_acquire`] never blocks or spins: a caller that loses
/// the race is expected to back off or report the resource as busy. Releasing
/// a flag that is not held is a programming error and panics.
///
/// Intended for resources shared between preemptive threads. Not suitable
/// for cooperative single-thread scheduling, where "check" and "lock" can
/// interleave with application logic in ways this primitive does not
/// anticipate.
#[derive(Debug, Default)]
pub struct ResourceFlag {
    held: Mutex<bool>,
}

impl ResourceFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the flag. Returns `false`, without waiting, if it is
    /// already held.
    pub fn try_acquire(&self) -> bool {
        let mut held = self.lock();
        if *held {
            false
        } else {
            *held = true;
            true
        }
    }

    /// Give the flag back.
    ///
    /// # Panics
    ///
    /// Panics if the flag is not currently held: a release without a
    /// matching acquire means some caller's pairing logic is broken, and
    /// silently ignoring it would hide the bug.
    pub fn release(&self) {
        let mut held = self.lock();
        assert!(*held, "resource flag released without a matching acquire");
        *held = false;
    }

    /// Whether the flag is currently held by someone.
    pub fn is_held(&self) -> bool {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.held.lock().expect("resource flag mutex poisoned")
    }
}
