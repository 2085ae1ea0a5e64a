//! Configuration constants.

/// Size of a page in bytes (4KB).
///
/// Every B+Tree node occupies exactly one page, so this value bounds the
/// default order of a tree (see `BPlusTree::max_order`).
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of pages addressable with a u32 `PageId`.
///
/// `u32::MAX` itself is reserved as the "no page" sentinel.
pub const MAX_PAGES: u64 = u32::MAX as u64;

/// Raw value of the "no page" sentinel as stored on disk.
pub const INVALID_PAGE_ID: u32 = u32::MAX;

/// Frame count used by `BufferPoolManager::with_default_size`.
pub const DEFAULT_POOL_SIZE: usize = 1024;
