//! Little-endian reading and zero padding helpers shared by the header
//! decoder and the layout builder.
//!
//! Fields are always read byte by byte so the result does not
//! depend on host endianness or struct layout.

use alloc::vec::Vec;

#[cfg(feature = "inspect")]
#[inline]
#[must_use]
pub fn read_u32_le(buf: &[u8], off: usize) -> Option<u32> {
    let end = off.checked_add(4)?;
    let s = buf.get(off..end)?;
    Some(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
}

/// Appends `count` zero bytes.
#[inline]
pub fn zero_fill(out: &mut Vec<u8>, count: usize) {
    out.resize(out.len() + count, 0);
}
