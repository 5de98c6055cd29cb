//! # Workbench - Concurrency and Subprocess Core for Desktop Applications
//!
//! The threading and external-process backbone of an event-driven desktop
//! application: synchronization primitives, thread-lifecycle wrappers,
//! bounded inter-thread string queues, and a managed shell-command execution
//! engine that keeps the UI event loop alive while commands run.
//!
//! ## Features
//!
//! - **UI-friendly waits**: command execution cooperates with a host event
//!   pump instead of freezing the interface
//! - **Cross-process locking**: file-backed advisory locks released
//!   automatically on process exit
//! - **Fixed capacities**: pools and queues sized for desktop use at compile
//!   time, with loud failure instead of silent degradation
//! - **Unix-first**: commands run through `sh -c`, signals through `kill(2)`
//!
//! ## Quick Start
//!
//! ```
//! use std::time::Duration;
//! use workbench::BoundedQueue;
//!
//! let queue = BoundedQueue::new(16);
//! queue.push("first", Duration::from_millis(50)).unwrap();
//! queue.push("second", Duration::from_millis(50)).unwrap();
//! assert_eq!(queue.pop_oldest().as_deref(), Some("first"));
//! assert_eq!(queue.pop_newest().as_deref(), Some("second"));
//! ```

pub mod exec;
pub mod queue;
pub mod sync;
pub mod thread;

pub use exec::{
    CommandExecutor, EventPump, LineStream, SignalAction, StreamPool, StreamStatus, signal_process,
};
pub use queue::{BoundedQueue, Mailbox};
pub use sync::{Barrier, GlobalLock, GuardedScalar, ResourceFlag};

/// Result type alias for Workbench operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
