//! # Flat Bootable Image
//!
//! A flat image is the Multiboot header immediately followed by the complete
//! kernel, with no gap and no build-specific fields. The same kernel bytes
//! therefore always produce the same image.

use crate::multiboot::{HEADER_SIZE, MultibootFlags, MultibootHeader};
use alloc::vec::Vec;

#[cfg(feature = "inspect")]
use crate::multiboot::HeaderError;

/// Prepends the default Multiboot header to `kernel`.
///
/// The kernel is **not** validated here. Callers must run
/// [`validate`](crate::elf::validate) first; assembling an unvalidated buffer
/// yields an image the loader will accept but cannot start.
#[must_use]
pub fn assemble(kernel: &[u8]) -> Vec<u8> {
    assemble_with_flags(kernel, MultibootFlags::new())
}

/// Like [`assemble`], requesting the loader features in `flags`.
#[must_use]
pub fn assemble_with_flags(kernel: &[u8], flags: MultibootFlags) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + kernel.len());
    out.extend_from_slice(&MultibootHeader::new(flags).to_bytes());
    out.extend_from_slice(kernel);
    out
}

/// Parsed view over a flat image produced by [`assemble`].
#[cfg(feature = "inspect")]
#[derive(Debug, Clone, Copy)]
pub struct FlatImage<'a> {
    header: MultibootHeader,
    kernel: &'a [u8],
}

#[cfg(feature = "inspect")]
impl<'a> FlatImage<'a> {
    /// Splits `blob` into its leading header and the kernel payload.
    ///
    /// # Errors
    /// Any [`HeaderError`] from decoding the first [`HEADER_SIZE`] bytes.
    pub fn parse(blob: &'a [u8]) -> Result<Self, HeaderError> {
        let header = MultibootHeader::from_bytes(blob)?;
        Ok(Self {
            header,
            kernel: &blob[HEADER_SIZE..],
        })
    }

    #[must_use]
    pub const fn header(&self) -> &MultibootHeader {
        &self.header
    }

    #[must_use]
    pub const fn kernel(&self) -> &'a [u8] {
        self.kernel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiboot::encode_header;

    const KERNEL: [u8; 8] = [0x7F, b'E', b'L', b'F', 0x02, 0xAA, 0xBB, 0xCC];

    #[test]
    fn header_then_kernel() {
        let img = assemble(&KERNEL);
        assert_eq!(img.len(), 20);
        assert_eq!(img[..HEADER_SIZE], encode_header());
        assert_eq!(img[HEADER_SIZE..], KERNEL);
    }

    #[test]
    fn empty_kernel_is_just_the_header() {
        assert_eq!(assemble(&[]), encode_header());
    }

    #[test]
    fn flags_change_header_only() {
        let flags = MultibootFlags::new().with_page_align(true);
        let img = assemble_with_flags(&KERNEL, flags);
        assert_ne!(img[..HEADER_SIZE], encode_header());
        assert_eq!(img[HEADER_SIZE..], KERNEL);
    }

    #[cfg(feature = "inspect")]
    #[test]
    fn parse_splits_payload() {
        let img = assemble(&KERNEL);
        let flat = FlatImage::parse(&img).unwrap();
        assert!(flat.header().is_valid());
        assert_eq!(flat.kernel(), KERNEL);
    }

    #[cfg(feature = "inspect")]
    #[test]
    fn parse_rejects_raw_kernel() {
        assert!(matches!(
            FlatImage::parse(&KERNEL),
            Err(HeaderError::TooShort)
        ));
        let mut padded = KERNEL.to_vec();
        padded.extend_from_slice(&[0; 8]);
        assert!(matches!(
            FlatImage::parse(&padded),
            Err(HeaderError::BadMagic { .. })
        ));
    }
}
