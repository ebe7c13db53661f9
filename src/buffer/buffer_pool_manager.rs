//! Buffer Pool Manager - the core page caching layer.
//!
//! A [`BufferPoolManager`] is one *instance* (shard) of the page cache:
//! - Page caching between disk and memory
//! - Pin-based reference counting through RAII guards
//! - Automatic dirty page write-back (WAL-first)
//! - LRU eviction of unpinned frames

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::buffer::replacer::LruReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::recovery::LogManager;
use crate::storage::DiskManager;

/// Manages a pool of buffer frames caching disk pages.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌─────────────────────────────┐  ┌─────────────────────┐   │
/// │  │ state (the instance latch)  │  │  frames: Vec<Frame> │   │
/// │  │  page_table: PageId → Fid ──┼─▶│ [F0] [F1] [F2] ...  │   │
/// │  │  free_list:  Vec<FrameId>   │  └─────────────────────┘   │
/// │  │  next_page_id (cursor)      │  ┌──────────┐ ┌────────┐   │
/// │  └─────────────────────────────┘  │ replacer │ │  disk  │   │
/// │                                   │  (LRU)   │ │ Mutex  │   │
/// │                                   └──────────┘ └────────┘   │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Latching
/// One exclusive latch (`state`) serializes every public operation of the
/// instance: page table, free list, frame metadata and replacer membership
/// all change under it, and disk I/O happens while it is held. The replacer
/// carries its own internal latch as well, but it is only ever called with
/// the instance latch held. Page *data* is not covered by the instance
/// latch: the pin count keeps a frame resident, and the per-frame
/// `RwLock<Page>` is the page-level latch clients synchronize reads and
/// writes on.
///
/// Every frame is in exactly one of three states: on the free list (empty),
/// in the replacer (resident, unpinned), or pinned (resident, in use).
///
/// # Sharding
/// An instance may be one shard of a
/// [`ParallelBufferPoolManager`](crate::buffer::ParallelBufferPoolManager).
/// Its allocation cursor starts at `instance_index` and advances by
/// `num_instances`, so every page id it hands out maps back to it under
/// `page_id % num_instances` routing.
///
/// # Usage
/// ```ignore
/// let dm = DiskManager::create("pool.db")?;
/// let pool = BufferPoolManager::new(64, dm);
///
/// // Allocate a new page
/// let mut guard = pool.new_page()?;
/// guard.as_mut_slice()[0] = 0xAB;
/// // guard drops: page marked dirty, unpinned
///
/// // Fetch an existing page for reading
/// let guard = pool.fetch_page_read(PageId::new(0))?;
/// let data = guard.as_slice();
/// ```
pub struct BufferPoolManager {
    /// Fixed pool of frames allocated at construction.
    frames: Vec<Frame>,

    /// The instance latch and everything it protects.
    state: Mutex<PoolState>,

    /// Eviction policy over unpinned resident frames. Internally latched;
    /// only called with the instance latch held.
    replacer: LruReplacer,

    /// Handles all disk I/O for this shard.
    disk_manager: Mutex<DiskManager>,

    /// Write-ahead-log hook; consulted before every dirty write-back.
    log_manager: Option<Arc<LogManager>>,

    /// Performance statistics.
    stats: BufferPoolStats,

    /// Number of frames in the pool (immutable after construction).
    pool_size: usize,

    /// Sharding parameters; `(1, 0)` for a standalone pool.
    num_instances: u32,
    instance_index: u32,
}

/// Mutable pool bookkeeping, all guarded by the instance latch.
struct PoolState {
    /// Maps resident page IDs to frame IDs.
    page_table: HashMap<PageId, FrameId>,

    /// Frames holding no page (LIFO).
    free_list: Vec<FrameId>,

    /// Next page ID this instance will allocate.
    next_page_id: u32,
}

impl BufferPoolManager {
    /// Create a standalone (unsharded) buffer pool.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        Self::sharded(pool_size, 1, 0, disk_manager, None)
    }

    /// Create one shard of a parallel buffer pool.
    ///
    /// The instance allocates page IDs congruent to `instance_index` modulo
    /// `num_instances`, starting at `instance_index`.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0, `num_instances` is 0, or
    /// `instance_index >= num_instances`.
    pub fn sharded(
        pool_size: usize,
        num_instances: u32,
        instance_index: u32,
        disk_manager: DiskManager,
        log_manager: Option<Arc<LogManager>>,
    ) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");
        assert!(num_instances > 0, "num_instances must be > 0");
        assert!(
            instance_index < num_instances,
            "instance_index out of range"
        );

        // Allocate all frames upfront
        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();

        // All frames start on the free list
        let free_list: Vec<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                next_page_id: instance_index,
            }),
            replacer: LruReplacer::new(pool_size),
            disk_manager: Mutex::new(disk_manager),
            log_manager,
            stats: BufferPoolStats::new(),
            pool_size,
            num_instances,
            instance_index,
        }
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page for reading (shared access).
    ///
    /// If the page is resident, returns immediately; otherwise loads it from
    /// disk, evicting an unpinned page if no frame is free. The page stays
    /// pinned until the guard drops.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    /// - `Error::InvalidPageId` for the INVALID sentinel
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_frame(page_id)?;
        let lock = self.frames[frame_id.0].page();

        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for writing (exclusive access).
    ///
    /// Same as [`fetch_page_read`](Self::fetch_page_read), but exclusive;
    /// the page is marked dirty when the guard drops.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_frame(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Public API: Create and delete pages
    // ========================================================================

    /// Allocate a fresh page and return a write guard for it.
    ///
    /// The new page's ID comes from this instance's allocation cursor and
    /// its content starts zeroed. Nothing is written to disk yet: the page
    /// becomes durable on a later flush or eviction.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let mut state = self.state.lock();

        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id.0];

        let page_id = self.allocate_page_id(&mut state);

        state.page_table.insert(page_id, frame_id);
        frame.set_page_id(page_id);
        debug_assert_eq!(frame.pin_count(), 0);
        frame.pin();
        frame.clear_dirty();
        self.replacer.pin(frame_id);

        // Zero the content through the same lock the guard will hand out.
        let mut lock = frame.page_mut();
        lock.reset();

        drop(state);
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Delete a page from the buffer pool.
    ///
    /// Idempotent: deleting a page that is not resident succeeds. The disk
    /// manager is notified so the slot can eventually be reclaimed.
    ///
    /// # Errors
    /// - `Error::PagePinned` if a client still holds the page
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.state.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()), // not resident: nothing to do
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Err(Error::PagePinned(page_id.0));
        }

        self.disk_manager.lock().deallocate_page(page_id);

        state.page_table.remove(&page_id);
        self.replacer.pin(frame_id); // withdraw from the evictable set
        frame.reset();
        state.free_list.push(frame_id);

        debug!("deleted {}", page_id);
        Ok(())
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Flush a page to disk.
    ///
    /// Clean resident pages succeed without touching the disk. The page is
    /// pinned for the duration of the write (so it cannot be evicted out
    /// from under the flush) and unpinned again before returning.
    ///
    /// The write waits for any active write guard on the page; the instance
    /// latch is released first, so guard holders are never blocked against
    /// the flush.
    ///
    /// # Errors
    /// - `Error::PageNotResident` if the page is not in the pool (including
    ///   the INVALID sentinel, which can never be resident)
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frame_id = {
            let state = self.state.lock();

            let frame_id = match state.page_table.get(&page_id) {
                Some(&fid) => fid,
                None => return Err(Error::PageNotResident(page_id.0)),
            };

            // Hold a pin across the write so the frame stays put.
            self.frames[frame_id.0].pin();
            self.replacer.pin(frame_id);
            frame_id
        };

        let frame = &self.frames[frame_id.0];
        let result = if frame.is_dirty() {
            self.write_back(page_id, frame)
        } else {
            Ok(())
        };

        self.unpin_frame(frame_id, false);
        result
    }

    /// Flush every resident page to disk.
    ///
    /// Iterates over a snapshot of the resident set; pages evicted or
    /// deleted concurrently are skipped.
    pub fn flush_all_pages(&self) -> Result<()> {
        let resident: Vec<PageId> = {
            let state = self.state.lock();
            state.page_table.keys().copied().collect()
        };

        debug!(
            "instance {} flushing {} resident pages",
            self.instance_index,
            resident.len()
        );

        for page_id in resident {
            match self.flush_page(page_id) {
                Ok(()) => {}
                Err(Error::PageNotResident(_)) => {} // vanished since the snapshot
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Get the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Index of this shard within its parallel pool (0 for standalone).
    pub fn instance_index(&self) -> u32 {
        self.instance_index
    }

    /// Get the number of free frames.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Get the number of resident pages.
    pub fn resident_page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Number of frames currently eligible for eviction.
    pub fn evictable_frame_count(&self) -> usize {
        self.replacer.size()
    }

    // ========================================================================
    // Internal: Called by the guards on drop
    // ========================================================================

    /// Unpin a frame, called by guard drop after the page latch is released.
    ///
    /// The dirty hint ORs into the frame's dirty flag - a true is sticky
    /// until write-back clears it. When the pin count reaches zero the frame
    /// becomes the newest eviction candidate. Never touches the disk.
    pub(crate) fn unpin_frame(&self, frame_id: FrameId, is_dirty: bool) {
        let _state = self.state.lock();
        let frame = &self.frames[frame_id.0];

        if is_dirty {
            frame.mark_dirty();
        }

        if frame.unpin() == 0 {
            self.replacer.unpin(frame_id);
        }
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    /// Pin the frame holding `page_id`, loading the page if necessary.
    fn fetch_frame(&self, page_id: PageId) -> Result<FrameId> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }

        let mut state = self.state.lock();

        // Hit: pin and withdraw from eviction. The dirty flag is untouched.
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.0];
            frame.pin();
            self.replacer.pin(frame_id);
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(frame_id);
        }

        // Miss: take a frame and read the page into it.
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id.0];

        {
            let mut page = frame.page_mut();
            let mut dm = self.disk_manager.lock();
            if let Err(e) = dm.read_page(page_id, &mut page) {
                // Return the untouched frame rather than leaking it.
                state.free_list.push(frame_id);
                return Err(e);
            }
        }
        self.stats.disk_reads.fetch_add(1, Ordering::Relaxed);

        state.page_table.insert(page_id, frame_id);
        frame.set_page_id(page_id);
        debug_assert_eq!(frame.pin_count(), 0);
        frame.pin();
        frame.clear_dirty();
        self.replacer.pin(frame_id); // no-op for free-list frames

        Ok(frame_id)
    }

    // ========================================================================
    // Internal: Frame acquisition and eviction
    // ========================================================================

    /// Take a frame for reuse: free list first, then the LRU victim.
    ///
    /// The returned frame is empty, clean, and unpinned; a dirty victim has
    /// been written back and its page-table entry removed.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        // Free frames need no write-back
        if let Some(frame_id) = state.free_list.pop() {
            debug_assert!(self.frames[frame_id.0].is_free());
            return Ok(frame_id);
        }

        let frame_id = self.replacer.victim().ok_or(Error::NoFreeFrames)?;
        let frame = &self.frames[frame_id.0];

        let old_page_id = frame.page_id();
        debug_assert!(old_page_id.is_valid(), "victim frame holds no page");
        debug_assert_eq!(frame.pin_count(), 0, "victim frame is pinned");

        if frame.is_dirty() {
            if let Err(e) = self.write_back(old_page_id, frame) {
                // Put the victim back so the pool stays consistent.
                self.replacer.unpin(frame_id);
                return Err(e);
            }
        }

        state.page_table.remove(&old_page_id);
        frame.set_page_id(PageId::INVALID);
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        debug!("evicted {} from {}", old_page_id, frame_id);

        Ok(frame_id)
    }

    /// Write a frame's page to disk and clear its dirty flag.
    ///
    /// Honors the write-ahead rule: log records up to the page's LSN are
    /// flushed before the page itself.
    fn write_back(&self, page_id: PageId, frame: &Frame) -> Result<()> {
        let page = frame.page();

        if let Some(log) = &self.log_manager {
            log.flush_until(page.lsn());
        }

        {
            let mut dm = self.disk_manager.lock();
            dm.write_page(page_id, &page)?;
        }
        drop(page);

        frame.clear_dirty();
        self.stats.disk_writes.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    /// Hand out the next page ID for this instance.
    ///
    /// The cursor starts at `instance_index` and advances by
    /// `num_instances`, so ownership (`id % num_instances`) is invariant; a
    /// violation is a bug, not an error.
    fn allocate_page_id(&self, state: &mut PoolState) -> PageId {
        let page_id = PageId::new(state.next_page_id);
        state.next_page_id += self.num_instances;

        assert_eq!(
            page_id.0 % self.num_instances,
            self.instance_index,
            "allocated page id maps to another instance"
        );
        page_id
    }
}
