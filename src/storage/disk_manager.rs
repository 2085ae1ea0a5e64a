//! Disk Manager - page-granular access to the backing store.
//!
//! The [`DiskManager`] is the block-allocation layer underneath the buffer
//! pool. It either owns a database file or a volatile in-memory buffer with
//! the same page addressing, so the index can be exercised without touching
//! the filesystem.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::{MAX_PAGES, PAGE_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

enum Backing {
    File(File),
    Memory(Vec<u8>),
}

/// Manages page I/O for a single store.
///
/// # Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// # Thread Safety
/// `DiskManager` is single-threaded. The `BufferPoolManager` serializes
/// access to it.
///
/// # Durability
/// File-backed writes are followed by `fsync()`.
pub struct DiskManager {
    backing: Backing,
    page_count: u32,
}

impl DiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            backing: Backing::File(file),
            page_count: 0,
        })
    }

    /// Open an existing database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        Ok(Self {
            backing: Backing::File(file),
            page_count,
        })
    }

    /// Open an existing database file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Create a volatile store. Contents are lost when it is dropped.
    pub fn in_memory() -> Self {
        Self {
            backing: Backing::Memory(Vec::new()),
            page_count: 0,
        }
    }

    /// Whether this store lives only in memory.
    pub fn is_in_memory(&self) -> bool {
        matches!(self.backing, Backing::Memory(_))
    }

    /// Read a page from the store.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        let offset = self.offset_of(page_id)?;
        let mut page = Page::new();

        match &mut self.backing {
            Backing::File(file) => {
                file.seek(SeekFrom::Start(offset as u64))?;
                file.read_exact(page.as_mut_slice())?;
            }
            Backing::Memory(bytes) => {
                page.as_mut_slice()
                    .copy_from_slice(&bytes[offset..offset + PAGE_SIZE]);
            }
        }

        Ok(page)
    }

    /// Write a page to the store.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        let offset = self.offset_of(page_id)?;

        match &mut self.backing {
            Backing::File(file) => {
                file.seek(SeekFrom::Start(offset as u64))?;
                file.write_all(page.as_slice())?;
                file.sync_all()?;
            }
            Backing::Memory(bytes) => {
                bytes[offset..offset + PAGE_SIZE].copy_from_slice(page.as_slice());
            }
        }

        Ok(())
    }

    /// Allocate a new zeroed page and return its id.
    ///
    /// # Errors
    /// Returns `Error::InvalidPageId` once the id space is exhausted.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        if self.page_count as u64 >= MAX_PAGES {
            return Err(Error::InvalidPageId(self.page_count));
        }
        let page_id = PageId::new(self.page_count);

        match &mut self.backing {
            Backing::File(file) => {
                file.seek(SeekFrom::Start(page_id.0 as u64 * PAGE_SIZE as u64))?;
                file.write_all(&[0u8; PAGE_SIZE])?;
                file.sync_all()?;
            }
            Backing::Memory(bytes) => {
                bytes.resize(bytes.len() + PAGE_SIZE, 0);
            }
        }

        self.page_count += 1;
        Ok(page_id)
    }

    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (PAGE_SIZE as u64)
    }

    fn offset_of(&self, page_id: PageId) -> Result<usize> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }
        Ok(page_id.0 as usize * PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        DiskManager::create(&path).unwrap();
        assert!(DiskManager::create(&path).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        assert!(DiskManager::open(dir.path().join("nonexistent.db")).is_err());
    }

    #[test]
    fn test_file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut dm = DiskManager::create(&path).unwrap();
            let page_id = dm.allocate_page().unwrap();

            let mut page = Page::new();
            page.as_mut_slice()[0] = 0x42;
            dm.write_page(page_id, &page).unwrap();
        }

        let mut dm = DiskManager::open_or_create(&path).unwrap();
        assert!(!dm.is_in_memory());
        assert_eq!(dm.page_count(), 1);
        assert_eq!(dm.read_page(PageId::new(0)).unwrap().as_slice()[0], 0x42);
    }

    #[test]
    fn test_in_memory_pages() {
        let mut dm = DiskManager::in_memory();
        assert!(dm.is_in_memory());

        for i in 0..10u32 {
            let page_id = dm.allocate_page().unwrap();
            assert_eq!(page_id.0, i);

            let mut page = Page::new();
            page.as_mut_slice()[PAGE_SIZE - 1] = i as u8;
            dm.write_page(page_id, &page).unwrap();
        }

        assert_eq!(dm.file_size(), 10 * PAGE_SIZE as u64);
        for i in 0..10u32 {
            let page = dm.read_page(PageId::new(i)).unwrap();
            assert_eq!(page.as_slice()[PAGE_SIZE - 1], i as u8);
        }
    }

    #[test]
    fn test_unallocated_pages_rejected() {
        let mut dm = DiskManager::in_memory();
        dm.allocate_page().unwrap();

        assert!(matches!(
            dm.read_page(PageId::new(1)),
            Err(Error::PageNotFound(1))
        ));
        assert!(matches!(
            dm.write_page(PageId::new(5), &Page::new()),
            Err(Error::PageNotFound(5))
        ));
        assert!(matches!(
            dm.read_page(PageId::INVALID),
            Err(Error::InvalidPageId(_))
        ));
    }
}
