//! Configuration constants for tidepool.

/// Size of a page in bytes (4KB).
///
/// This value matches the OS page size on most systems and is the common
/// unit of database I/O. Pages are also *aligned* to this size so they can
/// be handed to Direct I/O (O_DIRECT) without copying.
///
/// # Memory Layout
/// With 4KB pages and 32-bit PageIds:
/// - Max pages: 2^32 - 1 (the top value is the INVALID sentinel)
/// - Max store size: just under 16TB
pub const PAGE_SIZE: usize = 4096;

/// Number of addressable pages with a u32 PageId (the max value is reserved
/// as the INVALID sentinel).
pub const MAX_PAGES: u64 = u32::MAX as u64;

/// Maximum theoretical store size in bytes.
pub const MAX_STORE_BYTES: u64 = MAX_PAGES * PAGE_SIZE as u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_max_store_size() {
        assert_eq!(MAX_STORE_BYTES, MAX_PAGES * 4096);
    }
}
