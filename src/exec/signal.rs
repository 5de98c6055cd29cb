//! Name-based process signaling
//!
//! Pauses, resumes, or terminates a running process identified by name.
//! Name resolution shells out to `pgrep` and takes the first match; signal
//! delivery is a raw `kill(2)`.

use std::process::Command;

use anyhow::{Context, bail};
use tracing::debug;

use crate::Result;

/// What to ask of the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// SIGSTOP: suspend the process.
    Pause,
    /// SIGCONT: resume a suspended process.
    Resume,
    /// SIGTERM: request a clean shutdown.
    Terminate,
}

impl SignalAction {
    fn signo(self) -> libc::c_int {
        match self {
            SignalAction::Pause => libc::SIGSTOP,
            SignalAction::Resume => libc::SIGCONT,
            SignalAction::Terminate => libc::SIGTERM,
        }
    }
}

/// Deliver `action` to the first running process whose name matches `name`.
/// Returns the PID that was signaled.
///
/// A paused target should be resumed before it is asked to terminate:
/// delivering SIGTERM to a stopped process behaves unpredictably across
/// platforms. That sequencing is the caller's responsibility.
pub fn signal_process(name: &str, action: SignalAction) -> Result<u32> {
    which::which("pgrep").context("process lookup requires pgrep on PATH")?;
    let output = Command::new("pgrep")
        .arg(name)
        .output()
        .context("running pgrep")?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty());
    let pid: u32 = match first {
        Some(first) => first
            .parse()
            .with_context(|| format!("unexpected pgrep output {first:?}"))?,
        None => bail!("no running process matches {name:?}"),
    };

    debug!(name, pid, ?action, "delivering signal");
    let rc = unsafe { libc::kill(pid as libc::pid_t, action.signo()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("signaling pid {pid}"));
    }
    Ok(pid)
}
