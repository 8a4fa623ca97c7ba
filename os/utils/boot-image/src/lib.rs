//! # Bootable Image Assembly
//!
//! Turns a compiled 64-bit kernel executable into artifacts a virtual machine
//! firmware or bootloader can start:
//!
//! * a **flat image**: a Multiboot header followed immediately by the kernel
//!   bytes ([`flat::assemble`]), and
//! * a **raw disc layout**: the kernel placed at a fixed offset behind a
//!   zero-filled system area and padded to a minimum size
//!   ([`disc::build_layout`]).
//!
//! ```text
//! kernel bytes ──► elf::validate ──┬──► multiboot::encode_header ──► flat::assemble
//!                                  │
//!                                  └──► disc::build_layout (format agnostic)
//! ```
//!
//! Every operation is a pure function from buffer(s) to a buffer; nothing in
//! this crate performs I/O or holds state, so both outputs can be built from
//! the same kernel buffer concurrently.
//!
//! The raw disc layout is **not** an ISO 9660 filesystem. It is a best-effort
//! layout for loaders that read the kernel from the fixed offset
//! [`disc::SYSTEM_AREA_SIZE`].

#![no_std]

extern crate alloc;

pub mod bytes;
pub mod disc;
pub mod elf;
pub mod flat;
pub mod multiboot;

pub use disc::{DEFAULT_MINIMUM_SIZE, RawDiscLayout, SYSTEM_AREA_SIZE, build_layout};
pub use elf::{ExecutableHeader, ValidationError, validate};
pub use flat::{assemble, assemble_with_flags};
pub use multiboot::{HEADER_SIZE, MULTIBOOT_MAGIC, MultibootFlags, MultibootHeader, encode_header};

#[cfg(feature = "inspect")]
pub use flat::FlatImage;
#[cfg(feature = "inspect")]
pub use multiboot::{HeaderError, find_header};
