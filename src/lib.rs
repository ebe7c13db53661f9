//! Tidepool - a sharded page buffer pool for disk-backed storage engines.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Storage clients (callers)                    │
//! │            table heaps, indexes, query execution, ...           │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │          ParallelBufferPoolManager  (buffer/parallel)           │
//! │           dispatch: page_id mod N  → one of N shards            │
//! │  ┌───────────────┐  ┌───────────────┐       ┌───────────────┐   │
//! │  │  Instance 0   │  │  Instance 1   │  ...  │  Instance N-1 │   │
//! │  │ frames + LRU  │  │ frames + LRU  │       │ frames + LRU  │   │
//! │  └───────┬───────┘  └───────┬───────┘       └───────┬───────┘   │
//! └──────────┼──────────────────┼───────────────────────┼───────────┘
//!            ↓                  ↓                       ↓
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              Storage layer (storage/)                           │
//! │        DiskManager + Page + PageHeader, LogManager hook         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every page read or write between a storage client and the disk goes
//! through a [`BufferPoolManager`] instance: a bounded set of in-memory
//! frames, a page table mapping resident page ids to frames, and an LRU
//! replacer choosing which unpinned frame to evict on a miss. Clients hold
//! pages through RAII guards ([`PageReadGuard`] / [`PageWriteGuard`]) whose
//! lifetime *is* the pin scope - dropping the guard unpins the page.
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Pool instances, parallel dispatch, LRU replacement
//! - [`storage`] - Disk I/O and the on-disk page format
//! - [`recovery`] - Write-ahead-log flush hook
//!
//! # Quick Start
//! ```no_run
//! use tidepool::buffer::BufferPoolManager;
//! use tidepool::storage::DiskManager;
//!
//! let dm = DiskManager::create("pool.db").unwrap();
//! let pool = BufferPoolManager::new(64, dm);
//!
//! // Allocate a page, write into it; the guard drop unpins it dirty.
//! let mut guard = pool.new_page().unwrap();
//! let pid = guard.page_id();
//! guard.as_mut_slice()[0] = 0xAB;
//! drop(guard);
//!
//! // Read it back.
//! let guard = pool.fetch_page_read(pid).unwrap();
//! assert_eq!(guard.as_slice()[0], 0xAB);
//! ```

pub mod buffer;
pub mod common;
pub mod recovery;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::{
    BufferPoolManager, BufferPoolStats, Frame, PageReadGuard, PageWriteGuard,
    ParallelBufferPoolManager, StatsSnapshot,
};
pub use recovery::LogManager;
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;
