//! Thread lifecycle wrappers
//!
//! Launchers for detached and joinable native threads. Thread creation can
//! fail transiently when the OS is briefly out of resources, so both
//! launchers retry for up to a second before giving up; retry exhaustion, or
//! any non-transient spawn error, is treated as fatal.

use std::sync::{Arc, Mutex};
use std::thread::{Builder, JoinHandle};
use std::time::Duration;

use tracing::warn;

const SPAWN_RETRIES: usize = 1_000;
const SPAWN_RETRY_PAUSE: Duration = Duration::from_millis(1);

/// Launch a fire-and-forget thread running `f`.
///
/// No cleanup call is required; the thread's resources are reclaimed by the
/// OS when `f` returns.
pub fn spawn_detached<F>(name: &str, f: F)
where
    F: FnOnce() + Send + 'static,
{
    drop(spawn_with_retry(name, f));
}

/// Launch a thread whose result must be observed with [`JoinHandle::join`].
///
/// A handle that is never joined leaks the thread's bookkeeping until the
/// process exits; join exactly once.
pub fn spawn_joinable<F, T>(name: &str, f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    spawn_with_retry(name, f)
}

fn spawn_with_retry<F, T>(name: &str, f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    // Builder::spawn consumes its closure even on failure, so the payload
    // is parked where every retry attempt can reach it.
    let payload = Arc::new(Mutex::new(Some(f)));
    for attempt in 1..=SPAWN_RETRIES {
        let payload = Arc::clone(&payload);
        let run = move || {
            let f = payload
                .lock()
                .expect("spawn payload mutex poisoned")
                .take()
                .expect("spawn payload already consumed");
            f()
        };
        match Builder::new().name(name.to_string()).spawn(run) {
            Ok(handle) => return handle,
            Err(err) if is_transient(&err) => {
                if attempt == 1 {
                    warn!(thread = name, error = %err, "thread spawn hit resource exhaustion, retrying");
                }
                std::thread::sleep(SPAWN_RETRY_PAUSE);
            }
            Err(err) => panic!("failed to spawn thread {name:?}: {err}"),
        }
    }
    panic!("failed to spawn thread {name:?} after {SPAWN_RETRIES} attempts");
}

fn is_transient(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EAGAIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_joinable_returns_closure_result() {
        let handle = spawn_joinable("test-worker", || 6 * 7);
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn test_joinable_thread_carries_name() {
        let handle = spawn_joinable("named-worker", || {
            std::thread::current().name().map(str::to_string)
        });
        assert_eq!(handle.join().unwrap().as_deref(), Some("named-worker"));
    }

    #[test]
    fn test_detached_thread_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        spawn_detached("test-detached", move || {
            flag.store(true, Ordering::SeqCst);
        });
        // Detached threads offer no join; poll briefly for the side effect.
        for _ in 0..200 {
            if ran.load(Ordering::SeqCst) {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("detached thread never ran");
    }
}
