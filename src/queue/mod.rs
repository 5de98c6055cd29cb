//! Bounded inter-thread string queues

pub mod bounded;
pub mod mailbox;

pub use bounded::BoundedQueue;
pub use mailbox::Mailbox;
