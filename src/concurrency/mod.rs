//! Lock hooks invoked around node access.
//!
//! The index does not latch pages itself. Before reading a node it asks the
//! [`LockContext`] for a shared lock on that page, before writing one it asks
//! for an exclusive lock; [`NodeLock`] releases on drop. [`NoopLockContext`]
//! grants everything and is what single-threaded callers pass.

mod lock_context;

pub use lock_context::{LockContext, LockMode, NodeLock, NoopLockContext};
