//! Storage layer - the block store and page formats.
//!
//! - [`DiskManager`] - Page-granular reads, writes and allocation
//! - [`page`] - Page buffer and header layout

mod disk_manager;
pub mod page;

pub use disk_manager::DiskManager;
