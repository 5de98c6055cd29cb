//! Synchronization primitives
//!
//! Intra-process primitives (guarded scalars, resource flags, barriers) plus
//! a cross-process advisory file lock. Each primitive owns exactly one mutex
//! and never takes another primitive's lock, so there is no lock ordering to
//! get wrong between them.

pub mod barrier;
pub mod flag;
pub mod global_lock;
pub mod guarded;

pub use barrier::Barrier;
pub use flag::ResourceFlag;
pub use global_lock::{GlobalLock, per_process_lock_path};
pub use guarded::GuardedScalar;
