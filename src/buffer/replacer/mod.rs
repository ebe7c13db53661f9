//! Eviction policy implementations (replacers).
//!
//! A replacer tracks the frames that are currently candidates for eviction
//! and picks the victim when the pool needs a frame back.
//!
//! - [`LruReplacer`] - evicts the least-recently-unpinned frame

mod lru;

pub use lru::LruReplacer;
