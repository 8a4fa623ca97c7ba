//! # Build Configuration
//!
//! Every input a build needs is carried explicitly in a [`BuildConfig`]; no
//! step changes the working directory or reads process-wide state.

use boot_image::DEFAULT_MINIMUM_SIZE;
use std::path::PathBuf;
use utils_accessors_derive::{Getters, Setters};

pub const DEFAULT_KERNEL_PATH: &str = "kernel/build/kernel-x86_64.bin";
pub const DEFAULT_FLAT_OUTPUT: &str = "kernel-multiboot.bin";
pub const DEFAULT_DISC_OUTPUT: &str = "myos-gui-bootable.iso";
pub const DEFAULT_STAGING_DIR: &str = "iso-boot";
pub const DEFAULT_MENU_TITLE: &str = "MyOS with GUI Desktop v1.0";
pub const DEFAULT_MENU_TIMEOUT: u32 = 2;

/// Whether the disc path may delegate to installed authoring tools.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ToolPolicy {
    /// Try the external tools in priority order, then the raw layout.
    #[default]
    PreferExternal,
    /// Always produce the raw layout.
    RawOnly,
}

#[derive(Debug, Clone, Getters, Setters)]
pub struct BuildConfig {
    #[setters(into)]
    kernel_path: PathBuf,
    #[setters(into)]
    flat_output: PathBuf,
    #[setters(into)]
    disc_output: PathBuf,
    #[setters(into)]
    staging_dir: PathBuf,
    #[getters(copy)]
    minimum_disc_size: usize,
    #[getters(copy)]
    tool_policy: ToolPolicy,
    #[setters(into)]
    menu_title: String,
    #[getters(copy)]
    menu_timeout: u32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            kernel_path: DEFAULT_KERNEL_PATH.into(),
            flat_output: DEFAULT_FLAT_OUTPUT.into(),
            disc_output: DEFAULT_DISC_OUTPUT.into(),
            staging_dir: DEFAULT_STAGING_DIR.into(),
            minimum_disc_size: DEFAULT_MINIMUM_SIZE,
            tool_policy: ToolPolicy::default(),
            menu_title: DEFAULT_MENU_TITLE.into(),
            menu_timeout: DEFAULT_MENU_TIMEOUT,
        }
    }
}

/// Error returned by [`parse_size`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid size {0:?}: expected bytes, 0x-prefixed hex, or a K/M/G suffix")]
pub struct ParseSizeError(String);

/// Parses a byte count such as `2000000`, `0x8000`, `512K`, `100M` or `1G`.
///
/// Suffixes are binary (`K` = 1024) and case-insensitive; an optional
/// trailing `B`/`iB` is accepted (`100MiB`).
///
/// # Errors
/// Returns [`ParseSizeError`] for malformed input or on overflow.
pub fn parse_size(s: &str) -> Result<usize, ParseSizeError> {
    let err = || ParseSizeError(s.to_owned());
    let t = s.trim();

    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return usize::from_str_radix(&hex.replace('_', ""), 16).map_err(|_| err());
    }

    let upper = t.to_ascii_uppercase();
    let upper = upper
        .strip_suffix("IB")
        .or_else(|| upper.strip_suffix('B'))
        .unwrap_or(&upper);

    let (digits, shift) = match upper.chars().last() {
        Some('K') => (&upper[..upper.len() - 1], 10),
        Some('M') => (&upper[..upper.len() - 1], 20),
        Some('G') => (&upper[..upper.len() - 1], 30),
        _ => (upper, 0),
    };

    let value: usize = digits.trim().replace('_', "").parse().map_err(|_| err())?;
    value.checked_mul(1 << shift).ok_or_else(err)
}
