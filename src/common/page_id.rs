//! Page identifier type.

use std::fmt;

use super::config::INVALID_PAGE_ID;

/// Identifies a page in the backing store.
///
/// Tree nodes never hold references to each other; children and leaf
/// siblings are stored as `PageId`s and resolved through the buffer pool on
/// every access.
///
/// # Example
/// ```
/// use pagedex::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(PageId::from_raw(u32::MAX), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel meaning "no page".
    pub const INVALID: PageId = PageId(INVALID_PAGE_ID);

    /// Size of an encoded page reference.
    pub const ENCODED_SIZE: usize = 4;

    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Decode a stored page reference, mapping the sentinel to `None`.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<PageId> {
        let id = PageId(raw);
        id.is_valid().then_some(id)
    }

    /// Encode an optional page reference, mapping `None` to the sentinel.
    #[inline]
    pub fn to_raw(id: Option<PageId>) -> u32 {
        id.unwrap_or(Self::INVALID).0
    }

    /// Read a little-endian page reference at `offset`.
    #[inline]
    pub(crate) fn read_le(buf: &[u8], offset: usize) -> u32 {
        let mut raw = [0u8; Self::ENCODED_SIZE];
        raw.copy_from_slice(&buf[offset..offset + Self::ENCODED_SIZE]);
        u32::from_le_bytes(raw)
    }

    /// Write a little-endian page reference at `offset`.
    #[inline]
    pub(crate) fn write_le(buf: &mut [u8], offset: usize, raw: u32) {
        buf[offset..offset + Self::ENCODED_SIZE].copy_from_slice(&raw.to_le_bytes());
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
