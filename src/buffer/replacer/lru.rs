//! LRU (Least Recently Used) replacement policy.

use hashlink::LinkedHashSet;
use parking_lot::Mutex;

use crate::common::FrameId;

/// An LRU eviction policy over the evictable frames of one pool instance.
///
/// A frame is present here iff it is resident and unpinned; the pool calls
/// [`unpin`](LruReplacer::unpin) when a frame's pin count drops to zero and
/// [`pin`](LruReplacer::pin) when the frame goes back into active use. The
/// victim is always the frame that has been evictable the longest.
///
/// # Ordering
/// `unpin(a); unpin(b); unpin(c)` makes `a` the next victim. Re-unpinning a
/// frame that is already evictable does NOT refresh its position.
///
/// # Complexity
/// All operations are O(1): a [`LinkedHashSet`] pairs the doubly-linked
/// recency order with a hash index from frame id to list position.
///
/// # Concurrency
/// Internally latched; the pool additionally holds its instance latch across
/// every call, so this latch is never contended in practice.
pub struct LruReplacer {
    inner: Mutex<LruInner>,
}

struct LruInner {
    /// Evictable frames, oldest at the front.
    queue: LinkedHashSet<FrameId>,

    /// Upper bound on the evictable set: the pool size. The pool's pin
    /// accounting keeps the set within bound; this is asserted, not trimmed.
    capacity: usize,
}

impl LruReplacer {
    /// Create a replacer for a pool of `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruInner {
                queue: LinkedHashSet::with_capacity(capacity),
                capacity,
            }),
        }
    }

    /// Remove and return the least-recently-unpinned frame.
    ///
    /// Returns `None` iff no frame is evictable.
    pub fn victim(&self) -> Option<FrameId> {
        self.inner.lock().queue.pop_front()
    }

    /// Mark a frame as in active use, withdrawing it from eviction.
    ///
    /// No-op if the frame is not currently evictable.
    pub fn pin(&self, frame_id: FrameId) {
        self.inner.lock().queue.remove(&frame_id);
    }

    /// Mark a frame as reusable, making it the newest eviction candidate.
    ///
    /// Idempotent: a frame that is already evictable keeps its position.
    pub fn unpin(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if inner.queue.contains(&frame_id) {
            return;
        }
        debug_assert!(
            inner.queue.len() < inner.capacity,
            "evictable set exceeds pool size"
        );
        inner.queue.insert(frame_id);
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.inner.lock().queue.len()
    }
}
