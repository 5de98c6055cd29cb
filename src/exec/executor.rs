//! Bounded pool for running shell commands off the calling thread
//!
//! Execution happens on a detached worker thread so the caller can keep a UI
//! event loop alive while it waits; from the caller's point of view the call
//! is synchronous and returns the command's decoded exit code.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, warn};

use super::{EventPump, decode_exit_status, shell_command};
use crate::thread::spawn_detached;

/// Hard cap on concurrent commands, process-wide per executor.
pub const MAX_COMMANDS: usize = 10;

/// How often a pumped wait re-checks its slot between event-pump calls.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Callback invoked with the command line and decoded exit code when a
/// command fails; hosts typically surface a modal acknowledgment from it.
pub type FailureCallback = Box<dyn Fn(&str, i32) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Free,
    Busy,
    Done(i32),
}

#[derive(Debug)]
struct Slot {
    command: Option<String>,
    state: SlotState,
}

/// Fixed-capacity executor for shell commands.
///
/// The pool deliberately refuses to queue: a caller asking for more than
/// [`MAX_COMMANDS`] concurrent commands has broken the application's sizing
/// assumptions, and the executor panics rather than silently degrade. Slots
/// are handed out under the pool mutex, so no two in-flight commands ever
/// share one.
pub struct CommandExecutor {
    inner: Arc<Pool>,
    on_failure: Option<FailureCallback>,
}

struct Pool {
    slots: Mutex<Vec<Slot>>,
    completed: Condvar,
}

impl Pool {
    fn lock_slots(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().expect("executor pool mutex poisoned")
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    pub fn new() -> Self {
        let slots = (0..MAX_COMMANDS)
            .map(|_| Slot {
                command: None,
                state: SlotState::Free,
            })
            .collect();
        Self {
            inner: Arc::new(Pool {
                slots: Mutex::new(slots),
                completed: Condvar::new(),
            }),
            on_failure: None,
        }
    }

    /// Register a callback for failed commands (non-zero decoded exit code).
    pub fn on_failure(mut self, callback: impl Fn(&str, i32) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Box::new(callback));
        self
    }

    /// Run `command` through the shell and block until it completes.
    ///
    /// For worker threads: the wait parks on a condvar until the background
    /// thread records the exit code. UI-thread callers must use
    /// [`CommandExecutor::run_pumped`] instead, or the interface freezes for
    /// the duration of the command.
    ///
    /// # Panics
    ///
    /// Panics if all [`MAX_COMMANDS`] slots are already in flight.
    pub fn run(&self, command: impl Into<String>) -> i32 {
        let command = command.into();
        let index = self.launch(&command);
        let code = self.wait_parked(index);
        self.finish(index, code)
    }

    /// Run `command` from the UI thread, invoking `pump` between 10 ms polls
    /// so the event loop keeps servicing the interface while the command
    /// runs. Identical to [`CommandExecutor::run`] in every other respect.
    pub fn run_pumped(&self, command: impl Into<String>, pump: &dyn EventPump) -> i32 {
        let command = command.into();
        let index = self.launch(&command);
        let code = self.wait_pumped(index, pump);
        self.finish(index, code)
    }

    /// Number of commands currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner
            .lock_slots()
            .iter()
            .filter(|slot| slot.state != SlotState::Free)
            .count()
    }

    /// Claim a free slot, mark it busy, and hand the command to a detached
    /// worker that runs it synchronously and records the decoded status.
    fn launch(&self, command: &str) -> usize {
        let claimed = {
            let mut slots = self.inner.lock_slots();
            let free = slots.iter().position(|slot| slot.state == SlotState::Free);
            if let Some(index) = free {
                slots[index].command = Some(command.to_string());
                slots[index].state = SlotState::Busy;
            }
            free
        };
        // Panic outside the lock so commands already in flight can still
        // record their completion.
        let Some(index) = claimed else {
            panic!("command executor exhausted: {MAX_COMMANDS} commands already in flight");
        };
        debug!(command, slot = index, "running shell command");

        let pool = Arc::clone(&self.inner);
        let command_line = command.to_string();
        spawn_detached("command-executor", move || {
            let code = match shell_command(&command_line).status() {
                Ok(status) => decode_exit_status(status),
                Err(err) => {
                    warn!(command = %command_line, error = %err, "failed to launch shell");
                    libc::EPERM
                }
            };
            let mut slots = pool.lock_slots();
            slots[index].state = SlotState::Done(code);
            pool.completed.notify_all();
        });
        index
    }

    fn wait_parked(&self, index: usize) -> i32 {
        let mut slots = self.inner.lock_slots();
        loop {
            if let SlotState::Done(code) = slots[index].state {
                return code;
            }
            slots = self
                .inner
                .completed
                .wait(slots)
                .expect("executor pool mutex poisoned");
        }
    }

    fn wait_pumped(&self, index: usize, pump: &dyn EventPump) -> i32 {
        loop {
            {
                let slots = self.inner.lock_slots();
                if let SlotState::Done(code) = slots[index].state {
                    return code;
                }
            }
            pump.pump();
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Release the slot once the caller has observed the exit code, then
    /// report the failure if there was one.
    fn finish(&self, index: usize, code: i32) -> i32 {
        let command = {
            let mut slots = self.inner.lock_slots();
            slots[index].state = SlotState::Free;
            slots[index].command.take().unwrap_or_default()
        };
        if code != 0 {
            warn!(command = %command, code, "shell command failed");
            if let Some(callback) = &self.on_failure {
                callback(&command, code);
            }
        }
        code
    }
}
