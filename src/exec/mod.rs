//! Managed execution of external commands
//!
//! Everything here runs commands through the platform shell (`sh -c`) with a
//! fully formatted command line; callers are responsible for quoting any
//! embedded shell metacharacters. Exit codes follow the platform wait-status
//! convention, with one deliberate remap for uniform caller handling (see
//! [`decode_exit_status`]).

pub mod executor;
pub mod signal;
pub mod stream;

pub use executor::CommandExecutor;
pub use signal::{SignalAction, signal_process};
pub use stream::{LineStream, StreamPool, StreamStatus};

use std::process::{Command, ExitStatus};

/// Hook into the host's UI event loop.
///
/// `pump` must process any pending UI events and return immediately, and it
/// must be safe to call when nothing is pending. The executor invokes it
/// between polls while the UI thread waits on a command; that is the only
/// thing keeping the interface responsive during the wait.
pub trait EventPump {
    fn pump(&self);
}

/// Conventional shell offset for signal deaths: 128 + signal number.
const EXIT_CODE_SIGNAL_BASE: i32 = 128;

/// What the shell reports when the command cannot be found or executed.
const EXIT_CODE_NOT_FOUND: i32 = 127;

/// Build a `sh -c` invocation for a fully formatted command line.
pub(crate) fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Decode a wait status into a caller-facing exit code.
///
/// Signal deaths map to the conventional `128 + signal`. The shell's 127
/// ("command not found") is remapped to `EPERM` so callers can treat every
/// flavor of "could not run that" as one condition.
pub(crate) fn decode_exit_status(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    let code = match status.code() {
        Some(code) => code,
        None => EXIT_CODE_SIGNAL_BASE + status.signal().unwrap_or(0),
    };
    if code == EXIT_CODE_NOT_FOUND {
        libc::EPERM
    } else {
        code
    }
}
