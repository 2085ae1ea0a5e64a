//! Page - the fundamental 4KB unit of storage.

use crate::common::config::PAGE_SIZE;

use super::page_header::{PageHeader, PageType};

/// A page of data (4KB, 4KB-aligned).
///
/// The unit of I/O between the disk manager and the buffer pool. Tree
/// nodes are serialized into the [`Page::body`] that follows the
/// [`PageHeader`], then [`Page::seal`]ed so the checksum covers the result.
///
/// # Example
/// ```
/// use pagedex::storage::page::{Page, PageType};
///
/// let mut page = Page::new();
/// page.body_mut()[0] = 0xFF;
/// page.seal(PageType::BTreeLeaf);
/// assert!(page.verify_checksum());
/// assert_eq!(page.page_type(), PageType::BTreeLeaf);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes following the page header.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.data[PageHeader::SIZE..]
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut [u8] {
        &mut self.data[PageHeader::SIZE..]
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }

    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    pub fn page_type(&self) -> PageType {
        PageType::from_u8(self.data[PageHeader::OFFSET_PAGE_TYPE])
    }

    /// Stamp the page type, keep the LSN, and recompute the checksum.
    ///
    /// Call this after the body is fully written.
    pub fn seal(&mut self, page_type: PageType) {
        let mut header = self.header();
        header.page_type = page_type;
        header.write_to(&mut self.data);

        let checksum = PageHeader::compute_checksum(&self.data);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the page checksum is valid.
    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_body_starts_after_header() {
        let mut page = Page::new();
        page.body_mut()[0] = 0xAB;

        assert_eq!(page.as_slice()[PageHeader::SIZE], 0xAB);
        assert_eq!(page.body().len(), PAGE_SIZE - PageHeader::SIZE);
    }

    #[test]
    fn test_seal_and_verify() {
        let mut page = Page::new();
        page.body_mut()[10] = 0x42;
        page.seal(PageType::BTreeInternal);

        assert!(page.verify_checksum());
        assert_eq!(page.page_type(), PageType::BTreeInternal);

        page.body_mut()[10] = 0x43;
        assert!(!page.verify_checksum());
    }

    #[test]
    fn test_zeroed_page_fails_verification() {
        // A never-written page has checksum 0, which is not the CRC of zeros.
        let page = Page::new();
        assert!(!page.verify_checksum());
        assert_eq!(page.page_type(), PageType::Invalid);
    }

    #[test]
    fn test_page_reset() {
        let mut page = Page::new();
        page.body_mut()[0] = 0xFF;
        page.seal(PageType::BTreeLeaf);

        page.reset();

        assert_eq!(page.as_slice().iter().filter(|&&b| b != 0).count(), 0);
    }
}
