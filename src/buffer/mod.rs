//! Buffer pool management.
//!
//! The buffer pool is the page cache every tree node is read through. It
//! manages a fixed pool of frames, each holding one page, and counts every
//! page that crosses the disk boundary so callers can bound access cost.
//!
//! # Components
//! - [`BufferPoolManager`] - The page cache
//! - [`Frame`] - A slot in the buffer pool holding a page + metadata
//! - [`PageGuard`] - RAII guard that unpins on drop and checks sealed page types
//! - [`BufferPoolStats`] - I/O and cache statistics
//! - [`replacer`] - Eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::{Frame, FrameId};
pub use page_guard::{PageGuard, PageLatch, PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
