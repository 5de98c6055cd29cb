//! Line-oriented iteration over subprocess output
//!
//! A fixed pool of contexts, each owning one open subprocess stdout pipe.
//! Iteration is pull-based: the caller asks for one line at a time and can
//! abandon the stream early with [`LineStream::kill`]. Running out of
//! contexts is an ordinary failure here, not a crash; the desktop host
//! degrades by refusing to open another stream.

use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Stdio};
use std::sync::{Arc, Mutex};

use anyhow::{Context, bail};
use tracing::{debug, warn};

use super::{decode_exit_status, shell_command};
use crate::Result;

/// Hard cap on concurrently open streams per pool.
pub const MAX_STREAMS: usize = 9;

/// Completion state of a stream's command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// The command is still attached (its pipe has not been drained or
    /// killed yet).
    Running,
    /// The command has been reaped; decoded exit code.
    Exited(i32),
}

/// Allocator for the fixed set of stream contexts.
///
/// Context numbers are reused, but only after the previous occupant's pipe
/// has been closed and its exit status recorded.
pub struct StreamPool {
    in_use: Arc<Mutex<[bool; MAX_STREAMS]>>,
}

impl Default for StreamPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamPool {
    pub fn new() -> Self {
        Self {
            in_use: Arc::new(Mutex::new([false; MAX_STREAMS])),
        }
    }

    /// Launch `command` under the shell and return a line iterator over its
    /// standard output, occupying the lowest free context.
    ///
    /// Fails gracefully (with a warning in the log) when all [`MAX_STREAMS`]
    /// contexts are in use or the shell cannot be spawned.
    pub fn open(&self, command: &str) -> Result<LineStream> {
        let Some(context) = self.claim_context() else {
            warn!(command, "no free output stream context ({MAX_STREAMS} already open)");
            bail!("all {MAX_STREAMS} output stream contexts are in use");
        };

        let spawned = shell_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => {
                self.release_context(context);
                return Err(err)
                    .with_context(|| format!("spawning shell for {command:?}"));
            }
        };
        let Some(stdout) = child.stdout.take() else {
            // Same cleanup as a failed spawn: the claimed context and the
            // child must not outlive the error.
            let _ = child.kill();
            let _ = child.wait();
            self.release_context(context);
            bail!("stdout pipe was unexpectedly not available");
        };
        debug!(command, context = context + 1, "opened output stream");

        Ok(LineStream {
            pool: Arc::clone(&self.in_use),
            context,
            child: Some(child),
            reader: Some(BufReader::new(stdout)),
            status: StreamStatus::Running,
        })
    }

    /// Number of contexts currently occupied.
    pub fn open_count(&self) -> usize {
        lock_contexts(&self.in_use).iter().filter(|used| **used).count()
    }

    /// Claim the lowest free context, or `None` when all are in use.
    fn claim_context(&self) -> Option<usize> {
        let mut in_use = lock_contexts(&self.in_use);
        let free = in_use.iter().position(|used| !used);
        if let Some(index) = free {
            in_use[index] = true;
        }
        free
    }

    /// Hand a claimed context back; every error path out of
    /// [`StreamPool::open`] must end up here.
    fn release_context(&self, context: usize) {
        lock_contexts(&self.in_use)[context] = false;
    }
}

fn lock_contexts(pool: &Mutex<[bool; MAX_STREAMS]>) -> std::sync::MutexGuard<'_, [bool; MAX_STREAMS]> {
    pool.lock().expect("stream pool mutex poisoned")
}

/// One open subprocess output stream.
///
/// The context it occupies is handed back as soon as the stream reaches
/// end-of-output, is killed, or the handle is dropped; the recorded exit
/// status stays readable on the handle afterwards.
pub struct LineStream {
    pool: Arc<Mutex<[bool; MAX_STREAMS]>>,
    context: usize,
    child: Option<Child>,
    reader: Option<BufReader<ChildStdout>>,
    status: StreamStatus,
}

impl LineStream {
    /// 1-based number of the context this stream occupies (or occupied).
    pub fn context(&self) -> usize {
        self.context + 1
    }

    /// Last recorded status: `Running` until the stream ends or is killed.
    pub fn status(&self) -> StreamStatus {
        self.status
    }

    /// Read the next line of output, right-trimmed.
    ///
    /// `None` marks end-of-stream; at that point the child has been reaped,
    /// its exit status recorded, and the context freed. Further calls keep
    /// returning `None`.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .context("reading subprocess output")?;
        if read == 0 {
            self.finish(false)?;
            return Ok(None);
        }
        Ok(Some(line.trim_end().to_string()))
    }

    /// Abandon the stream before it finishes: terminate the child, record
    /// whatever status the reap yields, and free the context immediately.
    /// No-op on an already-finished stream.
    pub fn kill(&mut self) -> Result<()> {
        if self.reader.is_some() {
            debug!(context = self.context + 1, "killing output stream");
            self.finish(true)?;
        }
        Ok(())
    }

    fn finish(&mut self, kill: bool) -> Result<()> {
        // Dropping the reader closes our end of the pipe.
        self.reader = None;
        if let Some(mut child) = self.child.take() {
            if kill {
                // A child that already exited on its own is fine.
                if let Err(err) = child.kill() {
                    if err.kind() != std::io::ErrorKind::InvalidInput {
                        warn!(context = self.context + 1, error = %err, "failed to kill subprocess");
                    }
                }
            }
            let status = child.wait().context("reaping subprocess")?;
            self.status = StreamStatus::Exited(decode_exit_status(status));
        }
        lock_contexts(&self.pool)[self.context] = false;
        Ok(())
    }
}

impl Drop for LineStream {
    fn drop(&mut self) {
        // Never leak a context; an abandoned open stream is killed.
        if self.reader.is_some() {
            let _ = self.kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_then_end_of_stream() {
        let pool = StreamPool::new();
        let mut stream = pool.open("printf 'a\\nb\\n'").unwrap();
        assert_eq!(stream.status(), StreamStatus::Running);
        assert_eq!(stream.next_line().unwrap().as_deref(), Some("a"));
        assert_eq!(stream.next_line().unwrap().as_deref(), Some("b"));
        assert_eq!(stream.next_line().unwrap(), None);
        assert_eq!(stream.status(), StreamStatus::Exited(0));
        assert_eq!(pool.open_count(), 0);
    }

    #[test]
    fn test_lines_are_right_trimmed() {
        let pool = StreamPool::new();
        let mut stream = pool.open("printf 'padded   \\n'").unwrap();
        assert_eq!(stream.next_line().unwrap().as_deref(), Some("padded"));
    }

    #[test]
    fn test_nonzero_exit_is_recorded() {
        let pool = StreamPool::new();
        let mut stream = pool.open("echo only; exit 4").unwrap();
        assert_eq!(stream.next_line().unwrap().as_deref(), Some("only"));
        assert_eq!(stream.next_line().unwrap(), None);
        assert_eq!(stream.status(), StreamStatus::Exited(4));
    }

    #[test]
    fn test_kill_frees_context_immediately() {
        let pool = StreamPool::new();
        // `exec` replaces the shell so the kill lands on the sleeper itself.
        let mut stream = pool.open("echo first; exec sleep 30").unwrap();
        assert_eq!(stream.next_line().unwrap().as_deref(), Some("first"));
        stream.kill().unwrap();
        assert_eq!(pool.open_count(), 0);
        assert!(matches!(stream.status(), StreamStatus::Exited(_)));
        // The freed context number is available for reuse right away.
        let reused = pool.open("true").unwrap();
        assert_eq!(reused.context(), stream.context());
    }

    #[test]
    fn test_exhaustion_fails_gracefully() {
        let pool = StreamPool::new();
        let mut streams = Vec::new();
        for _ in 0..MAX_STREAMS {
            streams.push(pool.open("exec sleep 30").unwrap());
        }
        assert!(pool.open("true").is_err());
        streams.clear(); // drop kills the sleepers and frees every context
        assert_eq!(pool.open_count(), 0);
        assert!(pool.open("true").is_ok());
    }

    #[test]
    fn test_failed_open_hands_the_context_back() {
        let pool = StreamPool::new();
        // Both error paths out of open() return the claimed context through
        // release_context; a released slot must be immediately reusable.
        let context = pool.claim_context().unwrap();
        assert_eq!(context, 0);
        assert_eq!(pool.open_count(), 1);
        pool.release_context(context);
        assert_eq!(pool.open_count(), 0);
        let stream = pool.open("true").unwrap();
        assert_eq!(stream.context(), 1);
    }

    #[test]
    fn test_contexts_are_distinct_while_open() {
        let pool = StreamPool::new();
        let a = pool.open("exec sleep 30").unwrap();
        let b = pool.open("exec sleep 30").unwrap();
        let c = pool.open("exec sleep 30").unwrap();
        let mut numbers = [a.context(), b.context(), c.context()];
        numbers.sort_unstable();
        assert_eq!(numbers, [1, 2, 3]);
    }
}
