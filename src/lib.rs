//! pagedex - a disk-resident B+ tree index over a pinned-page buffer pool.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            pagedex                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)                  │   │
//! │  │   BPlusTree → InnerNode / LeafNode → ScanIter            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                  ↓                          ↓                   │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐ │
//! │  │ Lock hooks (concurrency/)│  │  Buffer Pool (buffer/)      │ │
//! │  │  LockContext + NodeLock  │  │  BufferPoolManager + CLOCK  │ │
//! │  └──────────────────────────┘  │  Frame + PageGuards + Stats │ │
//! │                                └─────────────────────────────┘ │
//! │                                             ↓                   │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │        DiskManager + Page + PageHeader (crc32)           │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Error, config)
//! - [`buffer`] - Buffer pool management and eviction
//! - [`storage`] - Disk I/O and page formats
//! - [`concurrency`] - Per-node lock hooks
//! - [`index`] - The B+ tree
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use pagedex::{BPlusTree, BPlusTreeConfig, BufferPoolManager, DiskManager};
//! use pagedex::{Key, KeyType, NoopLockContext, PageId, RecordId};
//!
//! let dm = DiskManager::open_or_create("my_index.db").unwrap();
//! let bpm = Arc::new(BufferPoolManager::new(256, dm));
//! let config = BPlusTreeConfig::new(KeyType::Int);
//! let mut tree = BPlusTree::create(bpm.clone(), config, Arc::new(NoopLockContext)).unwrap();
//!
//! tree.put(Key::Int(1), RecordId::new(PageId::new(10), 0)).unwrap();
//! for rid in tree.scan_all().unwrap() {
//!     println!("{}", rid.unwrap());
//! }
//! bpm.flush_all_pages().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod concurrency;
pub mod index;
pub mod storage;

pub use common::config::PAGE_SIZE;
pub use common::{Error, PageId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, StatsSnapshot};
pub use concurrency::{LockContext, LockMode, NoopLockContext};
pub use index::btree::{BPlusTree, BPlusTreeConfig, Key, KeyType, RecordId, ScanIter, TreeShape};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;
