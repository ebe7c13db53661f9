//! Page header and type definitions.
//!
//! Every page starts with a [`PageHeader`] containing metadata:
//! - LSN of the last modification (drives the WAL-before-writeback rule)
//! - CRC32 checksum for integrity
//! - [`PageType`] discriminator

/// Type of page stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Uninitialized or corrupted page.
    #[default]
    Invalid = 0,
    /// Generic data page.
    Data = 1,
    /// Deallocated page awaiting reuse.
    Free = 2,
}

impl PageType {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::Data,
            2 => PageType::Free,
            _ => PageType::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (16 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       8     lsn (Log Sequence Number, little-endian)
/// 8       4     checksum (CRC32, little-endian)
/// 12      1     page_type (PageType as u8)
/// 13      3     reserved (zero)
/// ```
///
/// The LSN sits first so the buffer pool can read it cheaply on the
/// write-back path without decoding the rest of the header.
///
/// # Checksum
/// The checksum is computed over the entire page with the checksum field
/// itself set to zero. This allows verification without special handling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Log Sequence Number of last modification.
    pub lsn: u64,
    /// CRC32 checksum of the page contents.
    pub checksum: u32,
    /// Type of this page.
    pub page_type: PageType,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 16;

    /// Offset of each field within the header.
    pub const OFFSET_LSN: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 8;
    pub const OFFSET_PAGE_TYPE: usize = 12;

    /// Create a new header with the given page type.
    ///
    /// Checksum and LSN are initialized to zero.
    pub fn new(page_type: PageType) -> Self {
        Self {
            lsn: 0,
            checksum: 0,
            page_type,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        let lsn = Self::read_lsn(data);

        let checksum = u32::from_le_bytes([
            data[Self::OFFSET_CHECKSUM],
            data[Self::OFFSET_CHECKSUM + 1],
            data[Self::OFFSET_CHECKSUM + 2],
            data[Self::OFFSET_CHECKSUM + 3],
        ]);

        let page_type = PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]);

        Self {
            lsn,
            checksum,
            page_type,
        }
    }

    /// Read only the LSN field from a page buffer.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    #[inline]
    pub fn read_lsn(data: &[u8]) -> u64 {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");
        u64::from_le_bytes([
            data[Self::OFFSET_LSN],
            data[Self::OFFSET_LSN + 1],
            data[Self::OFFSET_LSN + 2],
            data[Self::OFFSET_LSN + 3],
            data[Self::OFFSET_LSN + 4],
            data[Self::OFFSET_LSN + 5],
            data[Self::OFFSET_LSN + 6],
            data[Self::OFFSET_LSN + 7],
        ])
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_LSN..Self::OFFSET_LSN + 8].copy_from_slice(&self.lsn.to_le_bytes());
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&self.checksum.to_le_bytes());
        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        data[Self::OFFSET_PAGE_TYPE + 1..Self::SIZE].fill(0);
    }

    /// Compute CRC32 checksum of a page.
    ///
    /// The checksum is computed with the checksum field (bytes 8-11) zeroed
    /// out, so the checksum doesn't include itself.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();

        // Hash bytes before the checksum field (the LSN)
        hasher.update(&page_data[..Self::OFFSET_CHECKSUM]);

        // Skip the checksum field by feeding zeros instead
        hasher.update(&[0u8; 4]);

        // Hash bytes after the checksum field to the end of the page
        hasher.update(&page_data[Self::OFFSET_CHECKSUM + 4..]);

        hasher.finalize()
    }

    /// Verify that the stored checksum matches the computed checksum.
    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(page_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::PAGE_SIZE;

    // --- PageType tests ---

    #[test]
    fn test_page_type_from_u8() {
        assert_eq!(PageType::from_u8(0), PageType::Invalid);
        assert_eq!(PageType::from_u8(1), PageType::Data);
        assert_eq!(PageType::from_u8(2), PageType::Free);
        assert_eq!(PageType::from_u8(255), PageType::Invalid);
    }

    #[test]
    fn test_page_type_default() {
        assert_eq!(PageType::default(), PageType::Invalid);
    }

    // --- PageHeader tests ---

    #[test]
    fn test_page_header_new() {
        let header = PageHeader::new(PageType::Data);
        assert_eq!(header.page_type, PageType::Data);
        assert_eq!(header.checksum, 0);
        assert_eq!(header.lsn, 0);
    }

    #[test]
    fn test_page_header_roundtrip() {
        let original = PageHeader {
            lsn: 0x123456789ABCDEF0,
            checksum: 0xDEADBEEF,
            page_type: PageType::Free,
        };

        let mut buffer = [0u8; PageHeader::SIZE];
        original.write_to(&mut buffer);

        let recovered = PageHeader::from_bytes(&buffer);
        assert_eq!(original, recovered);
    }

    #[test]
    fn test_page_header_byte_layout() {
        let header = PageHeader {
            lsn: 0x0807060504030201, // Little-endian: 01 02 03 04 05 06 07 08
            checksum: 0x04030201,    // Little-endian: 01 02 03 04
            page_type: PageType::Data,
        };

        let mut buffer = [0u8; PageHeader::SIZE];
        header.write_to(&mut buffer);

        assert_eq!(buffer[0], 0x01); // lsn byte 0 (LSB)
        assert_eq!(buffer[7], 0x08); // lsn byte 7 (MSB)
        assert_eq!(buffer[8], 0x01); // checksum byte 0 (LSB)
        assert_eq!(buffer[11], 0x04); // checksum byte 3 (MSB)
        assert_eq!(buffer[12], 1); // PageType::Data
        assert_eq!(&buffer[13..16], &[0, 0, 0]); // reserved
    }

    #[test]
    fn test_read_lsn_only() {
        let mut buffer = [0u8; PageHeader::SIZE];
        let header = PageHeader {
            lsn: 777,
            checksum: 0,
            page_type: PageType::Data,
        };
        header.write_to(&mut buffer);

        assert_eq!(PageHeader::read_lsn(&buffer), 777);
    }

    // --- Checksum tests ---

    #[test]
    fn test_checksum_deterministic() {
        let mut page_data = [0u8; PAGE_SIZE];
        page_data[100] = 0xAB;
        page_data[1000] = 0xCD;

        let checksum1 = PageHeader::compute_checksum(&page_data);
        let checksum2 = PageHeader::compute_checksum(&page_data);

        assert_eq!(checksum1, checksum2);
        assert_ne!(checksum1, 0);
    }

    #[test]
    fn test_checksum_changes_with_data() {
        let mut page1 = [0u8; PAGE_SIZE];
        let mut page2 = [0u8; PAGE_SIZE];

        page1[500] = 0xFF;
        page2[500] = 0xFE;

        assert_ne!(
            PageHeader::compute_checksum(&page1),
            PageHeader::compute_checksum(&page2)
        );
    }

    #[test]
    fn test_checksum_ignores_checksum_field() {
        let mut page_data = [0u8; PAGE_SIZE];
        page_data[100] = 0xAB;

        let checksum1 = PageHeader::compute_checksum(&page_data);

        // Write a different value into the checksum field (bytes 8-11)
        page_data[8] = 0xFF;
        page_data[9] = 0xFF;
        page_data[10] = 0xFF;
        page_data[11] = 0xFF;

        let checksum2 = PageHeader::compute_checksum(&page_data);

        assert_eq!(checksum1, checksum2);
    }

    #[test]
    fn test_checksum_verify() {
        let mut page_data = [0u8; PAGE_SIZE];
        page_data[100] = 0xAB;

        let checksum = PageHeader::compute_checksum(&page_data);
        let header = PageHeader {
            lsn: 0,
            checksum,
            page_type: PageType::Data,
        };

        assert!(header.verify_checksum(&page_data));

        // Corrupt the page
        page_data[100] = 0xFF;
        assert!(!header.verify_checksum(&page_data));
    }
}
