//! # Raw Disc Layout
//!
//! Fallback disc image used when no disc-authoring tool is installed:
//!
//! ```text
//! 0x0000 ┌──────────────────────────────┐
//!        │ system area, zero filled     │ SYSTEM_AREA_SIZE (32 KiB, sector 16)
//! 0x8000 ├──────────────────────────────┤
//!        │ kernel, verbatim             │ len(kernel)
//!        ├──────────────────────────────┤
//!        │ zero padding                 │ up to the minimum size, possibly empty
//!        └──────────────────────────────┘
//! ```
//!
//! This is **not** an ISO 9660 filesystem: there are no volume descriptors,
//! directory records, path tables or boot catalog. Only loaders that read
//! the kernel from [`SYSTEM_AREA_SIZE`] understand it.

use crate::bytes::zero_fill;
use alloc::vec::Vec;
use core::ops::Range;

/// Offset of the kernel payload. Fixed by the loader convention.
pub const SYSTEM_AREA_SIZE: usize = 32 * 1024;

/// Default minimum image size (100 MiB).
pub const DEFAULT_MINIMUM_SIZE: usize = 100 * 1024 * 1024;

/// Byte ranges of the three zones of a raw disc image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDiscLayout {
    pub system_area: Range<usize>,
    pub kernel: Range<usize>,
    pub padding: Range<usize>,
}

impl RawDiscLayout {
    /// Plans the zones for a kernel of `kernel_len` bytes and an image of at
    /// least `minimum_size` bytes. The kernel is never truncated.
    #[must_use]
    pub const fn plan(kernel_len: usize, minimum_size: usize) -> Self {
        let kernel_end = SYSTEM_AREA_SIZE + kernel_len;
        let total = if kernel_end < minimum_size {
            minimum_size
        } else {
            kernel_end
        };

        Self {
            system_area: 0..SYSTEM_AREA_SIZE,
            kernel: SYSTEM_AREA_SIZE..kernel_end,
            padding: kernel_end..total,
        }
    }

    /// Total image length: `max(minimum, SYSTEM_AREA_SIZE + len(kernel))`.
    #[must_use]
    pub const fn total_len(&self) -> usize {
        self.padding.end
    }

    #[must_use]
    pub const fn padding_len(&self) -> usize {
        self.padding.end - self.padding.start
    }
}

/// Lays out `kernel` behind the zeroed system area and pads the result to
/// `minimum_size`. The kernel bytes are copied as-is; they need not be a
/// validated executable.
#[must_use]
pub fn build_layout(kernel: &[u8], minimum_size: usize) -> Vec<u8> {
    let layout = RawDiscLayout::plan(kernel.len(), minimum_size);

    let mut out = Vec::with_capacity(layout.total_len());
    zero_fill(&mut out, layout.system_area.len());
    out.extend_from_slice(kernel);
    zero_fill(&mut out, layout.padding_len());

    debug_assert_eq!(out.len(), layout.total_len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_exceeding_minimum_is_not_padded() {
        let kernel = [0x5Au8; 1000];
        let img = build_layout(&kernel, 0);
        assert_eq!(img.len(), 33_768);
        assert!(img[..SYSTEM_AREA_SIZE].iter().all(|&b| b == 0));
        assert_eq!(img[SYSTEM_AREA_SIZE..], kernel);
    }

    #[test]
    fn empty_kernel_is_all_padding() {
        let img = build_layout(&[], 2_000_000);
        assert_eq!(img.len(), 2_000_000);
        assert!(img.iter().all(|&b| b == 0));
    }

    #[test]
    fn plan_zones() {
        let layout = RawDiscLayout::plan(10, 40_000);
        assert_eq!(layout.system_area, 0..32_768);
        assert_eq!(layout.kernel, 32_768..32_778);
        assert_eq!(layout.padding, 32_778..40_000);
        assert_eq!(layout.total_len(), 40_000);
    }

    #[test]
    fn minimum_equal_to_content_adds_nothing() {
        let layout = RawDiscLayout::plan(100, SYSTEM_AREA_SIZE + 100);
        assert_eq!(layout.padding_len(), 0);
        assert_eq!(layout.total_len(), SYSTEM_AREA_SIZE + 100);
    }

    #[test]
    fn default_minimum_is_100_mib() {
        assert_eq!(DEFAULT_MINIMUM_SIZE, 104_857_600);
    }
}
