//! RAII guards for page access.
//!
//! These guards provide safe access to pages in the buffer pool:
//! - [`PageReadGuard`] - Shared read access (multiple allowed)
//! - [`PageWriteGuard`] - Exclusive write access (marks dirty)
//!
//! A guard's lifetime *is* the pin scope: the page cannot be evicted or
//! deleted while a guard exists, and dropping the guard unpins it. This
//! removes the "forgot to unpin" leak by construction.
//!
//! Drop order matters: the page latch is released *before* the unpin takes
//! the instance latch. A flush can hold the instance latch while waiting for
//! a page latch, so unpinning while still holding the page latch would
//! deadlock against it.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Guard for read-only page access.
///
/// Multiple `PageReadGuard`s can exist for the same page simultaneously.
/// Dropping the guard unpins the page without marking it dirty.
///
/// # Example
/// ```ignore
/// let guard = pool.fetch_page_read(page_id)?;
/// let data = guard.as_slice();  // Deref to &Page
/// // guard drops here, page unpinned
/// ```
pub struct PageReadGuard<'a> {
    /// Pool to unpin against on drop.
    pool: &'a BufferPoolManager,
    /// Frame holding this page.
    frame_id: FrameId,
    /// Page ID for convenience.
    page_id: PageId,
    /// Page latch; `Some` until drop releases it.
    lock: Option<RwLockReadGuard<'a, Page>>,
}

impl<'a> PageReadGuard<'a> {
    /// Called by `BufferPoolManager::fetch_page_read()`.
    pub(crate) fn new(
        pool: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        self.lock.as_deref().expect("page latch released")
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        // Release the page latch, then unpin. Read access never dirties.
        self.lock = None;
        self.pool.unpin_frame(self.frame_id, false);
    }
}

/// Guard for exclusive write access to a page.
///
/// Only one `PageWriteGuard` can exist for a page at a time. Dropping the
/// guard unpins the page and marks it dirty, which keeps it scheduled for
/// write-back (the dirty bit is sticky until the next write-back clears it).
///
/// # Example
/// ```ignore
/// let mut guard = pool.fetch_page_write(page_id)?;
/// guard.as_mut_slice()[0] = 0xFF;  // DerefMut to &mut Page
/// // guard drops here, page marked dirty and unpinned
/// ```
pub struct PageWriteGuard<'a> {
    /// Pool to unpin against on drop.
    pool: &'a BufferPoolManager,
    /// Frame holding this page.
    frame_id: FrameId,
    /// Page ID for convenience.
    page_id: PageId,
    /// Page latch; `Some` until drop releases it.
    lock: Option<RwLockWriteGuard<'a, Page>>,
}

impl<'a> PageWriteGuard<'a> {
    /// Called by `BufferPoolManager::fetch_page_write()` and `new_page()`.
    pub(crate) fn new(
        pool: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    /// Get the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get the frame ID.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        self.lock.as_deref().expect("page latch released")
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.lock.as_deref_mut().expect("page latch released")
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        // Release the page latch, then unpin. Write access is conservatively
        // treated as a modification.
        self.lock = None;
        self.pool.unpin_frame(self.frame_id, true);
    }
}
