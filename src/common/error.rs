//! Error types for tidepool.

use std::fmt;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in tidepool.
///
/// Every recoverable failure of the pool is reported through this enum;
/// invariant violations (pin-count underflow, an allocation cursor handing
/// out a page id belonging to another shard) are programming bugs and panic
/// instead.
#[derive(Debug)]
pub enum Error {
    /// I/O error from disk operations.
    Io(std::io::Error),

    /// Every frame is pinned and the free list is empty: fetch and new-page
    /// requests cannot acquire a frame.
    NoFreeFrames,

    /// The page is not resident in the pool (flush target missing).
    PageNotResident(u32),

    /// The page is still pinned by at least one client (delete refused).
    PagePinned(u32),

    /// The operation was given the INVALID sentinel or an otherwise
    /// unusable page ID.
    InvalidPageId(u32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::NoFreeFrames => write!(f, "No free frames available in buffer pool"),
            Error::PageNotResident(pid) => write!(f, "Page {} is not resident", pid),
            Error::PagePinned(pid) => write!(f, "Page {} is pinned", pid),
            Error::InvalidPageId(pid) => write!(f, "Invalid page ID: {}", pid),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
