//! Error types.

use thiserror::Error;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors surfaced by the page cache, the block layer and the index.
///
/// Not-found lookups are not errors: `get` returns `Ok(None)` and scans
/// return an empty iterator.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist in the backing store.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// The sentinel page id was used where a real page was required.
    #[error("Invalid page ID: {0}")]
    InvalidPageId(u32),

    /// Buffer pool has no free frames and every resident page is pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// Attempted to drop a page from the pool while it is still pinned.
    #[error("Page {0} is pinned")]
    PagePinned(u32),

    /// A page failed checksum verification or holds an unexpected layout.
    #[error("Page {page_id} is corrupted: {reason}")]
    Corrupted { page_id: u32, reason: String },

    /// The operation is not valid in the tree's current state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A caller-supplied parameter is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A key does not belong to the tree's key type.
    #[error("Key type mismatch: expected {expected}, got {actual}")]
    KeyTypeMismatch { expected: String, actual: String },
}

impl Error {
    pub(crate) fn corrupted(page_id: u32, reason: impl Into<String>) -> Self {
        Error::Corrupted {
            page_id,
            reason: reason.into(),
        }
    }
}
