//! Disk Manager - low-level file I/O for database pages.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages at their fixed offsets
//! - Deallocation notifications from the buffer pool
//! - Managing the database file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, trace};

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// The store is a single file with pages laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Page N is located at file offset `N × PAGE_SIZE`. Page ids are handed out
/// by the buffer pool's allocation cursor, so the file may be sparse: a page
/// that was allocated but never written back reads as zeroes.
///
/// # Thread Safety
/// `DiskManager` is **single-threaded**. Each buffer pool instance wraps its
/// handle in a latch; sharded pools open one handle per shard so shard I/O
/// can proceed in parallel.
///
/// # Durability
/// All writes are followed by `fsync()` so a page write is durable when
/// `write_page` returns.
pub struct DiskManager {
    file: File,
    /// Pages deallocated by the buffer pool. There is no free-space reuse
    /// yet; the count exists for introspection.
    deallocated_count: u64,
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
            file,
            deallocated_count: 0,
        })
    }

    /// Open an existing database file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        Ok(Self {
            file,
            deallocated_count: 0,
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

    /// Read a page from disk into the given buffer.
    ///
    /// A page slot that lies past the end of the file, or that the file only
    /// partially covers, reads as zeroes: allocation is driven by the buffer
    /// pool's cursor and a freshly allocated page has no bytes on disk until
    /// its first write-back.
    pub fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        let file_size = self.file.metadata()?.len();

        page.reset();
        if offset >= file_size {
            trace!("read of unwritten page {}, zero-filled", page_id);
            return Ok(());
        }

        self.file.seek(SeekFrom::Start(offset))?;

        // Read up to a full page; a short read near EOF leaves the tail zeroed.
        let buf = page.as_mut_slice();
        let mut filled = 0;
        while filled < PAGE_SIZE {
            match self.file.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }

        Ok(())
    }

    /// Write a page to disk.
    ///
    /// Extends the file if the page slot lies past the current end.
    ///
    /// # Durability
    /// This method calls `fsync()` after writing, so the data is persisted
    /// to disk when it returns.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?; // fsync for durability

        Ok(())
    }

    /// Record that the buffer pool deleted a page.
    ///
    /// The slot is not reclaimed; reclamation needs a free-space map, which
    /// lives above this layer.
    pub fn deallocate_page(&mut self, page_id: PageId) {
        debug!("deallocated {}", page_id);
        self.deallocated_count += 1;
    }

    /// Number of pages deallocated over this handle's lifetime.
    #[inline]
    pub fn deallocated_count(&self) -> u64 {
        self.deallocated_count
    }

    /// Number of whole page slots the file currently covers.
    pub fn page_capacity(&self) -> Result<u32> {
        let file_size = self.file.metadata()?.len();
        Ok((file_size / PAGE_SIZE as u64) as u32)
    }

    /// Total size of the database file in bytes.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}
