//! RAII guards for page access.
//!
//! A guard is the only way to touch a resident page. It keeps the frame
//! pinned for as long as it lives and unpins on drop, so an early return or
//! `?` inside a node visit never leaks a pin. One guard type serves both
//! access modes; the latch it holds decides whether the frame comes back
//! dirty.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use super::buffer_pool_manager::BufferPoolManager;
use super::frame::FrameId;
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageType};

/// The frame latch a guard holds while the page is in use.
pub trait PageLatch: Deref<Target = Page> {
    /// Whether releasing this latch leaves the frame dirty.
    const DIRTIES: bool;
}

impl PageLatch for RwLockReadGuard<'_, Page> {
    const DIRTIES: bool = false;
}

impl PageLatch for RwLockWriteGuard<'_, Page> {
    const DIRTIES: bool = true;
}

/// A pinned, latched page.
pub struct PageGuard<'a, L: PageLatch> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    latch: L,
}

/// Shared access. Unpins clean.
pub type PageReadGuard<'a> = PageGuard<'a, RwLockReadGuard<'a, Page>>;

/// Exclusive access. Unpins dirty whether or not the page changed.
pub type PageWriteGuard<'a> = PageGuard<'a, RwLockWriteGuard<'a, Page>>;

impl<'a, L: PageLatch> PageGuard<'a, L> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, frame_id: FrameId, page_id: PageId, latch: L) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            latch,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Check that the page is intact and was last sealed as one of
    /// `accepted`, returning its type.
    ///
    /// Failures are [`Error::Corrupted`] naming this guard's page.
    pub fn sealed_as(&self, accepted: &[PageType]) -> Result<PageType> {
        if !self.latch.verify_checksum() {
            return Err(Error::corrupted(self.page_id.0, "checksum mismatch"));
        }
        let page_type = self.latch.page_type();
        if !accepted.contains(&page_type) {
            return Err(Error::corrupted(
                self.page_id.0,
                format!("expected one of {:?}, found {:?}", accepted, page_type),
            ));
        }
        Ok(page_type)
    }
}

impl<L: PageLatch> Deref for PageGuard<'_, L> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.latch
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.latch
    }
}

impl<L: PageLatch> Drop for PageGuard<'_, L> {
    fn drop(&mut self) {
        self.bpm.unpin_page_internal(self.frame_id, L::DIRTIES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DiskManager;

    #[test]
    fn test_sealed_as_checks_type_and_checksum() {
        let bpm = BufferPoolManager::new(4, DiskManager::in_memory());
        let page_id = {
            let mut guard = bpm.new_page().unwrap();
            guard.seal(PageType::BTreeLeaf);
            guard.page_id()
        };

        {
            let guard = bpm.fetch_page_read(page_id).unwrap();
            assert_eq!(
                guard.sealed_as(&[PageType::BTreeLeaf, PageType::BTreeInternal]).unwrap(),
                PageType::BTreeLeaf
            );
            assert!(matches!(
                guard.sealed_as(&[PageType::BTreeMeta]),
                Err(Error::Corrupted { .. })
            ));
        }

        bpm.fetch_page_write(page_id).unwrap().body_mut()[0] ^= 0xFF;
        let guard = bpm.fetch_page_read(page_id).unwrap();
        assert!(matches!(
            guard.sealed_as(&[PageType::BTreeLeaf]),
            Err(Error::Corrupted { page_id: p, .. }) if p == page_id.0
        ));
    }

    #[test]
    fn test_guards_unpin_on_drop() {
        let bpm = BufferPoolManager::new(4, DiskManager::in_memory());
        let page_id = bpm.new_page().unwrap().page_id();

        let first = bpm.fetch_page_read(page_id).unwrap();
        let second = bpm.fetch_page_read(page_id).unwrap();
        assert_eq!(bpm.pinned_frame_count(), 1);

        drop(first);
        assert_eq!(bpm.pinned_frame_count(), 1);
        drop(second);
        assert_eq!(bpm.pinned_frame_count(), 0);
    }
}
