//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a [`Page`] plus the metadata buffer management needs:
//! - Which page is resident (or [`PageId::INVALID`] if the slot is empty)
//! - Pin count for reference counting
//! - Dirty flag for write-back tracking

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// A frame in the buffer pool.
///
/// Frames are the "slots" in the buffer pool. Each frame can hold one page.
/// A pool instance allocates its frames once at construction; frame ids are
/// indexes into that array and never change.
///
/// # Thread Safety
/// Metadata is only *mutated* while the owning instance's latch is held, but
/// it may be *read* from other threads (guards, statistics), so every field
/// uses interior mutability:
/// - `page`: `RwLock` - the page-level read/write latch clients synchronize on
/// - `page_id`: `Mutex` - updated on load/evict
/// - `pin_count`: `AtomicU32` - reference count
/// - `dirty`: `AtomicBool` - write-back tracking
pub struct Frame {
    /// The page data, protected by the page-level latch.
    page: RwLock<Page>,

    /// Which page is currently resident; INVALID when the frame is free.
    page_id: Mutex<PageId>,

    /// Number of active references to this frame.
    pin_count: AtomicU32,

    /// Whether the page has been modified since it was last read from or
    /// written to disk.
    dirty: AtomicBool,
}

impl Frame {
    /// Create a new empty frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            page_id: Mutex::new(PageId::INVALID),
            pin_count: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Page access (RwLock)
    // ========================================================================

    /// Acquire read latch on the page data.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire write latch on the page data.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    // ========================================================================
    // Page ID management
    // ========================================================================

    /// The page resident in this frame, or INVALID if the frame is free.
    #[inline]
    pub fn page_id(&self) -> PageId {
        *self.page_id.lock()
    }

    /// Set the resident page ID.
    #[inline]
    pub fn set_page_id(&self, page_id: PageId) {
        *self.page_id.lock() = page_id;
    }

    // ========================================================================
    // Pin count operations
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    /// Get the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    /// Check if the frame is currently pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Dirty flag operations
    // ========================================================================

    /// Mark the frame as dirty (modified).
    #[inline]
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Clear the dirty flag (after write-back).
    #[inline]
    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Relaxed);
    }

    /// Check if the frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Frame state queries
    // ========================================================================

    /// Check if the frame holds no page.
    #[inline]
    pub fn is_free(&self) -> bool {
        !self.page_id().is_valid()
    }

    /// Reset the frame to the free state: no page, unpinned, clean, zeroed.
    ///
    /// Called when a page is deleted so the frame can re-enter the free list.
    pub fn reset(&self) {
        self.page_mut().reset();
        self.set_page_id(PageId::INVALID);
        self.pin_count.store(0, Ordering::Relaxed);
        self.dirty.store(false, Ordering::Relaxed);
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame = Frame::new();
        assert!(frame.is_free());
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty());
        assert_eq!(frame.pin_count(), 0);
        assert_eq!(frame.page_id(), PageId::INVALID);
    }

    #[test]
    fn test_frame_pin_unpin() {
        let frame = Frame::new();

        assert_eq!(frame.pin(), 1);
        assert!(frame.is_pinned());

        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.pin_count(), 2);

        assert_eq!(frame.unpin(), 1);
        assert!(frame.is_pinned());

        assert_eq!(frame.unpin(), 0);
        assert!(!frame.is_pinned());
    }

    #[test]
    #[should_panic(expected = "pin count underflow")]
    fn test_frame_unpin_underflow() {
        let frame = Frame::new();
        frame.unpin();
    }

    #[test]
    fn test_frame_dirty_flag() {
        let frame = Frame::new();
        assert!(!frame.is_dirty());

        frame.mark_dirty();
        assert!(frame.is_dirty());

        frame.clear_dirty();
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_frame_page_access() {
        let frame = Frame::new();

        frame.page_mut().as_mut_slice()[0] = 0xAB;
        assert_eq!(frame.page().as_slice()[0], 0xAB);
    }

    #[test]
    fn test_frame_page_id() {
        let frame = Frame::new();
        assert!(frame.is_free());

        frame.set_page_id(PageId::new(42));
        assert_eq!(frame.page_id(), PageId::new(42));
        assert!(!frame.is_free());
    }

    #[test]
    fn test_frame_reset() {
        let frame = Frame::new();

        frame.set_page_id(PageId::new(99));
        frame.pin();
        frame.mark_dirty();
        frame.page_mut().as_mut_slice()[100] = 0xFF;

        frame.reset();

        assert!(frame.is_free());
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty());
        assert_eq!(frame.page().as_slice()[100], 0);
    }

    #[test]
    fn test_frame_concurrent_reads() {
        use std::sync::Arc;
        use std::thread;

        let frame = Arc::new(Frame::new());
        frame.page_mut().as_mut_slice()[0] = 0x42;

        let mut handles = vec![];

        for _ in 0..10 {
            let frame_clone = Arc::clone(&frame);
            handles.push(thread::spawn(move || {
                let page = frame_clone.page();
                assert_eq!(page.as_slice()[0], 0x42);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_frame_concurrent_pin() {
        use std::sync::Arc;
        use std::thread;

        let frame = Arc::new(Frame::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let frame_clone = Arc::clone(&frame);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    frame_clone.pin();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(frame.pin_count(), 1000);
    }
}
