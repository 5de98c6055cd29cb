//! Mutex-guarded shared integers
//!
//! Ad-hoc counters and flags shared between threads, each protected by its
//! own mutex. Earlier designs funneled every such value through a single
//! process-wide guard with a separate acquire and release call; here the
//! paired calls are replaced by a closure that runs under the lock, so a
//! release cannot be forgotten and unrelated values never contend.

use std::sync::{Mutex, MutexGuard};

/// A shared integer protected by its own mutex.
///
/// Wrap it in an `Arc` to share one value between threads.
#[derive(Debug, Default)]
pub struct GuardedScalar {
    value: Mutex<i64>,
}

impl GuardedScalar {
    pub fn new(initial: i64) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }

    /// Read the current value.
    pub fn get(&self) -> i64 {
        *self.lock()
    }

    /// Store a new value.
    pub fn set(&self, value: i64) {
        *self.lock() = value;
    }

    /// Add `delta` and return the new value, as one locked step.
    pub fn add(&self, delta: i64) -> i64 {
        let mut value = self.lock();
        *value += delta;
        *value
    }

    /// Run `f` with exclusive access to the value.
    ///
    /// The lock is held for exactly the duration of the closure; `f` must
    /// not call back into the same scalar.
    pub fn with<R>(&self, f: impl FnOnce(&mut i64) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, i64> {
        self.value.lock().expect("guarded scalar mutex poisoned")
    }
}
