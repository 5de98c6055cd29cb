//! Single-producer single-consumer text funnel
//!
//! A simpler sibling of the bounded queue for funneling formatted text from
//! one worker thread to one consumer, typically the UI thread polling from
//! its event loop (log fan-in is the archetypal use). The storage model is a
//! fixed ring of nullable slots: a slot is occupied exactly when it holds
//! `Some`, and separate oldest/newest cursors walk the ring with no separate
//! count.

use std::sync::{Condvar, Mutex, MutexGuard};

use anyhow::bail;

use crate::Result;

/// A fixed-capacity one-way string mailbox.
///
/// Designed for exactly one producer thread and one consumer; concurrent
/// consumers would race each other for the oldest slot.
#[derive(Debug)]
pub struct Mailbox {
    inner: Mutex<Inner>,
    freed: Condvar,
}

#[derive(Debug)]
struct Inner {
    slots: Vec<Option<String>>,
    /// Last slot the consumer drained.
    oldest: usize,
    /// Last slot the producer filled.
    newest: usize,
    closed: bool,
}

impl Mailbox {
    /// Create a mailbox holding at most `capacity` undelivered entries.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "mailbox capacity must be at least 1");
        Self {
            inner: Mutex::new(Inner {
                slots: vec![None; capacity],
                oldest: 0,
                newest: 0,
                closed: false,
            }),
            freed: Condvar::new(),
        }
    }

    /// Deposit `text`, blocking while the next slot is still occupied.
    ///
    /// Returns an error if the mailbox has been closed (including while the
    /// call was blocked waiting for space).
    pub fn put(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        let mut inner = self.lock();
        loop {
            if inner.closed {
                bail!("mailbox is closed");
            }
            let next = (inner.newest + 1) % inner.slots.len();
            if inner.slots[next].is_none() {
                inner.slots[next] = Some(text);
                inner.newest = next;
                return Ok(());
            }
            inner = self.freed.wait(inner).expect("mailbox mutex poisoned");
        }
    }

    /// Take the oldest undelivered entry, or `None` if the mailbox is empty
    /// (or closed). Never blocks, so the UI thread can poll it.
    pub fn get(&self) -> Option<String> {
        let mut inner = self.lock();
        if inner.slots.is_empty() {
            return None;
        }
        let next = (inner.oldest + 1) % inner.slots.len();
        let entry = inner.slots[next].take();
        if entry.is_some() {
            inner.oldest = next;
            self.freed.notify_one();
        }
        entry
    }

    /// Drop any undelivered entries and reduce capacity to zero. A producer
    /// blocked in [`Mailbox::put`] wakes up and observes the closed error.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.slots.clear();
        inner.oldest = 0;
        inner.newest = 0;
        inner.closed = true;
        self.freed.notify_all();
    }

    /// Number of undelivered entries currently held.
    pub fn len(&self) -> usize {
        self.lock().slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("mailbox mutex poisoned")
    }
}
