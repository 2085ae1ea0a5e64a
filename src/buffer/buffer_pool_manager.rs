//! Buffer Pool Manager - the page cache underneath the index.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between the disk manager and memory
//! - Pin-based reference counting through RAII guards
//! - Dirty page write-back on eviction and flush
//! - Observable I/O counts for access-cost assertions

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::buffer::replacer::ClockReplacer;
use crate::buffer::{BufferPoolStats, Frame, FrameId, PageReadGuard, PageWriteGuard};
use crate::common::config::DEFAULT_POOL_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::DiskManager;

/// Manages a pool of buffer frames for caching pages.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │disk_manager  │      │
/// │  │ Vec<FrameId> │  │ ClockReplacer│  │   Mutex      │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `page_table`: `RwLock` — many readers, few writers
/// - `free_list`, `replacer`, `disk_manager`: `Mutex`
/// - `frames`: fixed size, each Frame has internal locks
/// - `stats`: atomic counters
///
/// # Usage
/// ```
/// use pagedex::{BufferPoolManager, DiskManager};
///
/// let bpm = BufferPoolManager::new(8, DiskManager::in_memory());
/// let page_id = {
///     let mut guard = bpm.new_page().unwrap();
///     guard.body_mut()[0] = 0xAB;
///     guard.page_id()
/// };
///
/// let guard = bpm.fetch_page_read(page_id).unwrap();
/// assert_eq!(guard.body()[0], 0xAB);
/// ```
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    page_table: RwLock<HashMap<PageId, FrameId>>,
    /// Stack of free frame IDs (LIFO for cache locality).
    free_list: Mutex<Vec<FrameId>>,
    replacer: Mutex<ClockReplacer>,
    disk_manager: Mutex<DiskManager>,
    stats: BufferPoolStats,
    pool_size: usize,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager with `pool_size` frames.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: Vec<FrameId> = (0..pool_size).rev().map(FrameId::new).collect();

        Self {
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: Mutex::new(ClockReplacer::new(pool_size)),
            disk_manager: Mutex::new(disk_manager),
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    /// Create a pool with [`DEFAULT_POOL_SIZE`] frames.
    pub fn with_default_size(disk_manager: DiskManager) -> Self {
        Self::new(DEFAULT_POOL_SIZE, disk_manager)
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page for reading (shared access).
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page();

        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for writing (exclusive access).
    ///
    /// The page is marked dirty when the guard drops.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Public API: Create and delete pages
    // ========================================================================

    /// Allocate a new zeroed page and pin it for writing.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - I/O errors from the disk manager; the frame is returned to the
    ///   free list first
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.get_free_frame()?;

        let allocated = self.disk_manager.lock().allocate_page();
        let page_id = match allocated {
            Ok(page_id) => page_id,
            Err(err) => {
                self.release_frame(frame_id);
                return Err(err);
            }
        };

        let frame = &self.frames[frame_id.0];
        frame.page_mut().reset();
        frame.set_page_id(Some(page_id));
        frame.pin();
        // A fresh page has never been written; make sure it reaches disk.
        frame.mark_dirty();

        self.page_table.write().insert(page_id, frame_id);
        self.track_pinned(frame_id);

        let lock = frame.page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Drop a page from the pool without writing it back.
    ///
    /// The page stays allocated in the disk manager.
    ///
    /// # Errors
    /// Returns `Error::PagePinned` if the page is still pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut pt = self.page_table.write();

        let frame_id = match pt.get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Err(Error::PagePinned(page_id.0));
        }

        pt.remove(&page_id);
        drop(pt);

        frame.clear();
        self.release_frame(frame_id);
        Ok(())
    }

    // ========================================================================
    // Public API: Flush and evict
    // ========================================================================

    /// Flush a specific page to disk if it's dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frame_id = match self.page_table.read().get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        self.flush_frame(frame_id, page_id)
    }

    /// Flush all dirty pages to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        for (page_id, frame_id) in self.resident_pages() {
            self.flush_frame(frame_id, page_id)?;
        }
        Ok(())
    }

    /// Write back and drop every unpinned page.
    ///
    /// Afterwards every fetch of those pages is a cold read, which is what
    /// access-cost measurements start from. Pinned pages stay resident.
    pub fn evict_all(&self) -> Result<()> {
        let mut evicted = 0usize;

        for (page_id, frame_id) in self.resident_pages() {
            let frame = &self.frames[frame_id.0];
            if frame.is_pinned() {
                continue;
            }

            self.flush_frame(frame_id, page_id)?;
            self.page_table.write().remove(&page_id);
            frame.clear();
            self.release_frame(frame_id);
            evicted += 1;
        }

        self.stats.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        debug!(evicted, "buffer.evict_all");
        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Pages read from plus pages written to the disk manager so far.
    pub fn num_ios(&self) -> u64 {
        self.stats.num_ios()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Number of pages resident in the pool.
    pub fn page_count(&self) -> usize {
        self.page_table.read().len()
    }

    /// Number of frames with at least one outstanding guard.
    pub fn pinned_frame_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_pinned()).count()
    }

    /// Pin count of a resident page, or None if it is not in the pool.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let pt = self.page_table.read();
        pt.get(&page_id).map(|fid| self.frames[fid.0].pin_count())
    }

    // ========================================================================
    // Internal: Called by page guards on drop
    // ========================================================================

    pub(crate) fn unpin_page_internal(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];

        if is_dirty {
            frame.mark_dirty();
        }

        if frame.unpin() == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }

        {
            let pt = self.page_table.read();
            if let Some(&frame_id) = pt.get(&page_id) {
                self.frames[frame_id.0].pin();
                self.track_pinned(frame_id);
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(frame_id);
            }
        }

        self.handle_cache_miss(page_id)
    }

    fn handle_cache_miss(&self, page_id: PageId) -> Result<FrameId> {
        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        trace!(page_id = page_id.0, "buffer.cache_miss");

        let frame_id = self.get_free_frame()?;

        let read = self.disk_manager.lock().read_page(page_id);
        let page_data = match read {
            Ok(page) => page,
            Err(err) => {
                self.release_frame(frame_id);
                return Err(err);
            }
        };
        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);

        let frame = &self.frames[frame_id.0];
        frame
            .page_mut()
            .as_mut_slice()
            .copy_from_slice(page_data.as_slice());

        let mut pt = self.page_table.write();
        if let Some(&existing) = pt.get(&page_id) {
            // Another thread loaded the same page while we were reading.
            self.frames[existing.0].pin();
            drop(pt);
            self.track_pinned(existing);
            self.release_frame(frame_id);
            return Ok(existing);
        }

        frame.set_page_id(Some(page_id));
        frame.pin();
        pt.insert(page_id, frame_id);
        drop(pt);

        self.track_pinned(frame_id);
        Ok(frame_id)
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    fn track_pinned(&self, frame_id: FrameId) {
        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);
    }

    /// Hand an unused frame back to the free list.
    fn release_frame(&self, frame_id: FrameId) {
        self.replacer.lock().remove(frame_id);
        self.free_list.lock().push(frame_id);
    }

    fn get_free_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }

        self.evict_page()
    }

    fn evict_page(&self) -> Result<FrameId> {
        let frame_id = self
            .replacer
            .lock()
            .evict()
            .ok_or(Error::NoFreeFrames)?;

        let frame = &self.frames[frame_id.0];
        if let Some(old_page_id) = frame.page_id() {
            if let Err(err) = self.flush_frame(frame_id, old_page_id) {
                // Keep the page resident and evictable; nothing was lost.
                let mut replacer = self.replacer.lock();
                replacer.record_access(frame_id);
                replacer.set_evictable(frame_id, true);
                return Err(err);
            }
            self.page_table.write().remove(&old_page_id);
        }

        frame.clear();
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        Ok(frame_id)
    }

    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];

        if frame.is_dirty() {
            let page = frame.page();
            self.disk_manager.lock().write_page(page_id, &page)?;
            drop(page);

            frame.clear_dirty();
            self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }

    fn resident_pages(&self) -> Vec<(PageId, FrameId)> {
        let pt = self.page_table.read();
        pt.iter().map(|(&pid, &fid)| (pid, fid)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_bpm(pool_size: usize) -> BufferPoolManager {
        BufferPoolManager::new(pool_size, DiskManager::in_memory())
    }

    #[test]
    fn test_new_page_ids_are_sequential() {
        let bpm = create_test_bpm(10);

        assert_eq!(bpm.new_page().unwrap().page_id(), PageId::new(0));
        assert_eq!(bpm.new_page().unwrap().page_id(), PageId::new(1));
        assert_eq!(bpm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_write_then_read() {
        let bpm = create_test_bpm(10);

        {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[0] = 0xAB;
        }
        {
            let mut guard = bpm.fetch_page_write(PageId::new(0)).unwrap();
            assert_eq!(guard.as_slice()[0], 0xAB);
            guard.as_mut_slice()[0] = 0xCD;
        }

        let guard = bpm.fetch_page_read(PageId::new(0)).unwrap();
        assert_eq!(guard.as_slice()[0], 0xCD);
        assert_eq!(bpm.pin_count(PageId::new(0)), Some(1));
    }

    #[test]
    fn test_dirty_page_flushed_on_eviction() {
        let bpm = create_test_bpm(1);

        {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[0] = 0x42;
        }
        {
            let _guard = bpm.new_page().unwrap();
        }

        let guard = bpm.fetch_page_read(PageId::new(0)).unwrap();
        assert_eq!(guard.as_slice()[0], 0x42);
        assert!(bpm.stats().snapshot().evictions >= 1);
    }

    #[test]
    fn test_evict_all_makes_fetches_cold() {
        let bpm = create_test_bpm(10);
        for i in 0..4u8 {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[0] = i;
        }

        bpm.evict_all().unwrap();
        assert_eq!(bpm.page_count(), 0);
        assert_eq!(bpm.free_frame_count(), 10);

        let before = bpm.num_ios();
        for i in 0..4u32 {
            let guard = bpm.fetch_page_read(PageId::new(i)).unwrap();
            assert_eq!(guard.as_slice()[0], i as u8);
        }
        assert_eq!(bpm.num_ios() - before, 4);

        // Second round is served from the pool.
        let before = bpm.num_ios();
        drop(bpm.fetch_page_read(PageId::new(2)).unwrap());
        assert_eq!(bpm.num_ios(), before);
    }

    #[test]
    fn test_evict_all_keeps_pinned_pages() {
        let bpm = create_test_bpm(4);
        let pinned = bpm.new_page().unwrap();
        drop(bpm.new_page().unwrap());

        bpm.evict_all().unwrap();

        assert_eq!(bpm.page_count(), 1);
        assert_eq!(bpm.pin_count(pinned.page_id()), Some(1));
    }

    #[test]
    fn test_delete_pinned_page_fails() {
        let bpm = create_test_bpm(10);
        let _guard = bpm.new_page().unwrap();

        assert!(matches!(
            bpm.delete_page(PageId::new(0)),
            Err(Error::PagePinned(0))
        ));
    }

    #[test]
    fn test_delete_page_frees_frame() {
        let bpm = create_test_bpm(10);
        drop(bpm.new_page().unwrap());

        bpm.delete_page(PageId::new(0)).unwrap();

        assert_eq!(bpm.free_frame_count(), 10);
        assert_eq!(bpm.page_count(), 0);
    }

    #[test]
    fn test_page_not_found_releases_frame() {
        let bpm = create_test_bpm(2);

        assert!(matches!(
            bpm.fetch_page_read(PageId::new(999)),
            Err(Error::PageNotFound(999))
        ));
        assert_eq!(bpm.free_frame_count(), 2);
        assert_eq!(bpm.pinned_frame_count(), 0);
    }

    #[test]
    fn test_invalid_page_id_rejected() {
        let bpm = create_test_bpm(2);
        assert!(matches!(
            bpm.fetch_page_read(PageId::INVALID),
            Err(Error::InvalidPageId(_))
        ));
    }

    #[test]
    fn test_no_free_frames() {
        let bpm = create_test_bpm(2);
        let _guard1 = bpm.new_page().unwrap();
        let _guard2 = bpm.new_page().unwrap();

        assert!(matches!(bpm.new_page(), Err(Error::NoFreeFrames)));
    }

    #[test]
    fn test_flush_all_pages_writes_dirty_pages_once() {
        let bpm = create_test_bpm(10);
        for i in 0..5 {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[0] = i;
        }

        bpm.flush_all_pages().unwrap();
        assert_eq!(bpm.stats().snapshot().pages_written, 5);

        bpm.flush_all_pages().unwrap();
        assert_eq!(bpm.stats().snapshot().pages_written, 5);
    }

    #[test]
    fn test_concurrent_reads() {
        use std::sync::Arc;
        use std::thread;

        let bpm = Arc::new(create_test_bpm(10));
        {
            let mut guard = bpm.new_page().unwrap();
            guard.as_mut_slice()[0] = 0x42;
        }

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let bpm = Arc::clone(&bpm);
                thread::spawn(move || {
                    let guard = bpm.fetch_page_read(PageId::new(0)).unwrap();
                    assert_eq!(guard.as_slice()[0], 0x42);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(bpm.pinned_frame_count(), 0);
    }
}
