//! N-party rendezvous barrier

use std::sync::{Condvar, Mutex, MutexGuard};

/// A rendezvous point that releases a fixed number of threads together.
///
/// Unlike `std::sync::Barrier`, the party count can be reconfigured between
/// rounds with [`Barrier::reset`]. There is no timeout: configuring more
/// parties than will ever call [`Barrier::wait`] leaves every waiter blocked
/// forever.
#[derive(Debug)]
pub struct Barrier {
    state: Mutex<State>,
    released: Condvar,
}

#[derive(Debug)]
struct State {
    parties: usize,
    waiting: usize,
    generation: u64,
}

impl Barrier {
    /// Create a barrier for `parties` threads.
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "barrier needs at least one party");
        Self {
            state: Mutex::new(State {
                parties,
                waiting: 0,
                generation: 0,
            }),
            released: Condvar::new(),
        }
    }

    /// Block until the configured number of threads are waiting, then
    /// release all of them at once.
    ///
    /// Exactly one waiter per round observes `true` (the one whose arrival
    /// completed the party), which is convenient for round-scoped work like
    /// collecting results.
    pub fn wait(&self) -> bool {
        let mut state = self.lock();
        let generation = state.generation;
        state.waiting += 1;
        if state.waiting >= state.parties {
            state.waiting = 0;
            state.generation = state.generation.wrapping_add(1);
            self.released.notify_all();
            return true;
        }
        while state.generation == generation {
            state = self
                .released
                .wait(state)
                .expect("barrier mutex poisoned");
        }
        false
    }

    /// Reconfigure the barrier for `parties` threads and start a fresh round.
    ///
    /// Resetting while threads are still blocked in [`Barrier::wait`] is a
    /// caller error: the stragglers are woken rather than left stranded on a
    /// dead round, but the rendezvous guarantee no longer holds for them.
    pub fn reset(&self, parties: usize) {
        assert!(parties > 0, "barrier needs at least one party");
        let mut state = self.lock();
        state.parties = parties;
        state.waiting = 0;
        state.generation = state.generation.wrapping_add(1);
        self.released.notify_all();
    }

    /// The currently configured party count.
    pub fn parties(&self) -> usize {
        self.lock().parties
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("barrier mutex poisoned")
    }
}
