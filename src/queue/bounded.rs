//! Fixed-capacity double-ended string queue
//!
//! A mutex-linearized deque with a hard capacity and a timed blocking
//! insert. Capacity pressure is the producer's problem: `push` waits for
//! space up to a caller-supplied deadline, while the pops never block.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::bail;

use crate::Result;

/// A fixed-capacity queue of strings, poppable from both ends.
///
/// All three operations serialize on the queue's own mutex, so a count
/// observed by one thread is consistent for every thread. Nothing is
/// guaranteed about ordering relative to other queues.
#[derive(Debug)]
pub struct BoundedQueue {
    entries: Mutex<VecDeque<String>>,
    space: Condvar,
    capacity: usize,
}

impl BoundedQueue {
    /// Create a queue holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be at least 1");
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            space: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of live entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Append `entry`, waiting up to `max_wait` for space if the queue is
    /// full. Returns the live count after the insert, or an error once the
    /// deadline passes with the queue still full.
    pub fn push(&self, entry: impl Into<String>, max_wait: Duration) -> Result<usize> {
        let deadline = Instant::now() + max_wait;
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            let now = Instant::now();
            if now >= deadline {
                bail!(
                    "queue full ({} entries): no space freed within {:?}",
                    self.capacity,
                    max_wait
                );
            }
            let (guard, _) = self
                .space
                .wait_timeout(entries, deadline - now)
                .expect("bounded queue mutex poisoned");
            entries = guard;
        }
        entries.push_back(entry.into());
        Ok(entries.len())
    }

    /// Remove and return the oldest entry, or `None` when empty.
    pub fn pop_oldest(&self) -> Option<String> {
        let mut entries = self.lock();
        let entry = entries.pop_front();
        if entry.is_some() {
            self.space.notify_one();
        }
        entry
    }

    /// Remove and return the newest entry, or `None` when empty.
    pub fn pop_newest(&self) -> Option<String> {
        let mut entries = self.lock();
        let entry = entries.pop_back();
        if entry.is_some() {
            self.space.notify_one();
        }
        entry
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.entries.lock().expect("bounded queue mutex poisoned")
    }
}
