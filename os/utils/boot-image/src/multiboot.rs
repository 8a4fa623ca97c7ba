//! # Multiboot (v1) Header
//!
//! A Multiboot header is three little-endian 32-bit words:
//!
//! ```text
//! offset  field     value
//! 0       magic     0x1BADB002
//! 4       flags     requested loader features (see [`MultibootFlags`])
//! 8       checksum  0 - (magic + flags)   (mod 2^32)
//! ```
//!
//! A loader only trusts the header if the three words sum to zero modulo
//! 2^32, so the checksum is always derived from the flags actually written.
//! The header must sit on a 4-byte boundary within the first
//! [`SEARCH_WINDOW`] bytes of the image.

#[cfg(feature = "inspect")]
use crate::bytes::read_u32_le;

/// Header signature the loader searches for.
pub const MULTIBOOT_MAGIC: u32 = 0x1BAD_B002;

/// Encoded size of the header in bytes.
pub const HEADER_SIZE: usize = 12;

/// The loader only scans this many leading bytes for the header.
pub const SEARCH_WINDOW: usize = 8192;

/// Header alignment required inside the search window.
pub const HEADER_ALIGN: usize = 4;

/// Bitfield for the Multiboot `flags` word.
///
/// Layout (LSB→MSB):
/// - bit 0: align modules on 4 KiB page boundaries
/// - bit 1: request a memory map
/// - bit 2: request video mode information
/// - bits 3..15: reserved, must be zero
/// - bit 16: header carries load address fields
/// - bits 17..31: reserved, must be zero
#[bitfield_struct::bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct MultibootFlags {
    #[bits(1)]
    pub page_align: bool,
    #[bits(1)]
    pub memory_info: bool,
    #[bits(1)]
    pub video_mode: bool,
    #[bits(13)]
    __: u16,
    #[bits(1)]
    pub address_fields: bool,
    #[bits(15)]
    __: u16,
}

/// Errors reported when reading a header back from an image.
#[cfg(feature = "inspect")]
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("image is too short to hold a Multiboot header")]
    TooShort,
    #[error("Multiboot magic not found (found {found:#010x})")]
    BadMagic { found: u32 },
    #[error("Multiboot checksum mismatch: magic + flags + checksum = {sum:#010x}")]
    BadChecksum { sum: u32 },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MultibootHeader {
    pub magic: u32,
    pub flags: MultibootFlags,
    pub checksum: u32,
}

impl MultibootHeader {
    /// Builds a header for `flags` with a freshly derived checksum.
    #[must_use]
    pub const fn new(flags: MultibootFlags) -> Self {
        Self {
            magic: MULTIBOOT_MAGIC,
            flags,
            checksum: checksum_for(MULTIBOOT_MAGIC, flags.into_bits()),
        }
    }

    /// Wrapping sum of the three words; zero for a loadable header.
    #[must_use]
    pub const fn word_sum(&self) -> u32 {
        self.magic
            .wrapping_add(self.flags.into_bits())
            .wrapping_add(self.checksum)
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.magic == MULTIBOOT_MAGIC && self.word_sum() == 0
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let words = [self.magic, self.flags.into_bits(), self.checksum];
        let mut bytes = [0u8; HEADER_SIZE];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// Decodes and verifies a header at the start of `bytes`.
    ///
    /// # Errors
    /// [`HeaderError::TooShort`] if fewer than [`HEADER_SIZE`] bytes are
    /// given, [`HeaderError::BadMagic`] or [`HeaderError::BadChecksum`] if the
    /// words do not form a loadable header.
    #[cfg(feature = "inspect")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        let (Some(magic), Some(flags), Some(checksum)) = (
            read_u32_le(bytes, 0),
            read_u32_le(bytes, 4),
            read_u32_le(bytes, 8),
        ) else {
            return Err(HeaderError::TooShort);
        };

        if magic != MULTIBOOT_MAGIC {
            return Err(HeaderError::BadMagic { found: magic });
        }

        let hdr = Self {
            magic,
            flags: MultibootFlags::from_bits(flags),
            checksum,
        };

        match hdr.word_sum() {
            0 => Ok(hdr),
            sum => Err(HeaderError::BadChecksum { sum }),
        }
    }
}

impl Default for MultibootHeader {
    fn default() -> Self {
        Self::new(MultibootFlags::new())
    }
}

/// `0 - (magic + flags)` modulo 2^32.
#[must_use]
pub const fn checksum_for(magic: u32, flags: u32) -> u32 {
    0u32.wrapping_sub(magic.wrapping_add(flags))
}

/// Encodes the header used for every build: no optional loader features.
#[must_use]
pub fn encode_header() -> [u8; HEADER_SIZE] {
    MultibootHeader::default().to_bytes()
}

/// Finds the first loadable header on a [`HEADER_ALIGN`] boundary inside the
/// loader's [`SEARCH_WINDOW`], returning its offset and decoded value.
#[cfg(feature = "inspect")]
#[must_use]
pub fn find_header(image: &[u8]) -> Option<(usize, MultibootHeader)> {
    let window = image.len().min(SEARCH_WINDOW);
    (0..window)
        .step_by(HEADER_ALIGN)
        .filter(|off| off + HEADER_SIZE <= window)
        .find_map(|off| {
            MultibootHeader::from_bytes(&image[off..])
                .ok()
                .map(|hdr| (off, hdr))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(bytes: &[u8; HEADER_SIZE]) -> [u32; 3] {
        [
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        ]
    }

    #[test]
    fn default_header_bytes() {
        let bytes = encode_header();
        assert_eq!(
            bytes,
            [
                0x02, 0xB0, 0xAD, 0x1B, // magic
                0x00, 0x00, 0x00, 0x00, // flags
                0xFE, 0x4F, 0x52, 0xE4, // checksum
            ]
        );
        assert_eq!(words(&bytes), [MULTIBOOT_MAGIC, 0, 0xE452_4FFE]);
    }

    #[test]
    fn checksum_follows_flags() {
        let flags = MultibootFlags::new()
            .with_page_align(true)
            .with_memory_info(true);
        assert_eq!(flags.into_bits(), 0b11);

        let hdr = MultibootHeader::new(flags);
        assert!(hdr.is_valid());
        assert_eq!(hdr.checksum, checksum_for(MULTIBOOT_MAGIC, 3));

        let [m, f, c] = words(&hdr.to_bytes());
        assert_eq!(m.wrapping_add(f).wrapping_add(c), 0);
    }

    #[test]
    fn address_fields_is_bit_16() {
        let flags = MultibootFlags::new().with_address_fields(true);
        assert_eq!(flags.into_bits(), 1 << 16);
    }

    #[cfg(feature = "inspect")]
    #[test]
    fn from_bytes_round_trips_and_rejects() {
        let hdr = MultibootHeader::new(MultibootFlags::new().with_video_mode(true));
        assert_eq!(MultibootHeader::from_bytes(&hdr.to_bytes()), Ok(hdr));

        assert_eq!(
            MultibootHeader::from_bytes(&[0x02, 0xB0]),
            Err(HeaderError::TooShort)
        );

        let mut bad = encode_header();
        bad[0] = 0;
        assert_eq!(
            MultibootHeader::from_bytes(&bad),
            Err(HeaderError::BadMagic { found: 0x1BAD_B000 })
        );

        let mut bad = encode_header();
        bad[4] = 1;
        assert_eq!(
            MultibootHeader::from_bytes(&bad),
            Err(HeaderError::BadChecksum { sum: 1 })
        );
    }

    #[cfg(feature = "inspect")]
    #[test]
    fn find_header_scans_aligned_offsets() {
        let mut image = alloc::vec![0xCCu8; 64];
        image[20..32].copy_from_slice(&encode_header());
        assert_eq!(find_header(&image).map(|(off, _)| off), Some(20));

        // A header outside the 4-byte grid is not seen.
        let mut image = alloc::vec![0xCCu8; 64];
        image[18..30].copy_from_slice(&encode_header());
        assert_eq!(find_header(&image), None);
    }

    #[cfg(feature = "inspect")]
    #[test]
    fn find_header_respects_search_window() {
        let mut image = alloc::vec![0u8; SEARCH_WINDOW + 64];
        image[SEARCH_WINDOW..SEARCH_WINDOW + HEADER_SIZE].copy_from_slice(&encode_header());
        assert_eq!(find_header(&image), None);

        let last = SEARCH_WINDOW - HEADER_SIZE;
        image[last..last + HEADER_SIZE].copy_from_slice(&encode_header());
        assert_eq!(find_header(&image).map(|(off, _)| off), Some(last));
    }
}
