//! Cross-process advisory file locks
//!
//! Mutual exclusion between unrelated OS processes, built on `flock(2)`.
//! The lock lives on the open descriptor, not on the file: dropping the
//! handle releases it, and so does the owning process exiting, however
//! abruptly, so no stale-lock cleanup protocol is needed.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::Result;

/// An exclusive advisory lock on a file, held until the handle is dropped.
///
/// The lock file itself is deliberately left on disk after release; repeated
/// lock/unlock cycles then skip the create step, and the file's presence
/// carries no meaning on its own.
#[derive(Debug)]
pub struct GlobalLock {
    file: File,
    path: PathBuf,
}

impl GlobalLock {
    /// Open or create the lock file at `path`, then block until an exclusive
    /// advisory lock on it is granted.
    ///
    /// There is no timeout: the call returns only once every other holder of
    /// the same path has released (or died). Failure to open or create the
    /// file is an ordinary error, not fatal.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("opening lock file {}", path.display()))?;
        flock_exclusive(&file).with_context(|| format!("locking {}", path.display()))?;
        debug!(path = %path.display(), "global lock acquired");
        Ok(Self { file, path })
    }

    /// Path of the lock file backing this handle.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock by closing the descriptor. Dropping the handle has
    /// the same effect; this form just makes the release point explicit.
    pub fn unlock(self) {
        debug!(path = %self.path.display(), "global lock released");
        drop(self.file);
    }
}

/// Block in `flock(LOCK_EX)` until the lock is granted, retrying on signal
/// interruption.
fn flock_exclusive(file: &File) -> std::io::Result<()> {
    loop {
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Derive a per-process lock file name by appending the caller's PID to
/// `base`, for callers that want a lock no other process will contend on.
pub fn per_process_lock_path(base: impl AsRef<Path>) -> PathBuf {
    let mut name = base.as_ref().as_os_str().to_os_string();
    name.push(format!(".{}", std::process::id()));
    PathBuf::from(name)
}
