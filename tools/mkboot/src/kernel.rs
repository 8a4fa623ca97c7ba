use crate::error::BuildError;
use boot_image::ExecutableHeader;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::{fs, io};

/// Kernel bytes read once from storage and never mutated afterwards.
#[derive(Debug)]
pub struct KernelImage {
    path: PathBuf,
    bytes: Box<[u8]>,
}

impl KernelImage {
    /// Reads the whole kernel file into memory; the file handle is released
    /// before this returns.
    ///
    /// # Errors
    /// [`BuildError::InputNotFound`] if `path` does not exist,
    /// [`BuildError::InputReadFailed`] for any other read failure.
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => BuildError::InputNotFound {
                path: path.to_path_buf(),
            },
            _ => BuildError::InputReadFailed {
                path: path.to_path_buf(),
                source,
            },
        })?;

        info!("Kernel {}: {} bytes", path.display(), bytes.len());
        Ok(Self {
            path: path.to_path_buf(),
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Checks the kernel is a 64-bit ELF executable.
    ///
    /// # Errors
    /// [`BuildError::InvalidKernel`] wrapping the first failed check.
    pub fn validate(&self) -> Result<ExecutableHeader, BuildError> {
        let hdr = ExecutableHeader::parse(&self.bytes).map_err(|source| {
            BuildError::InvalidKernel {
                path: self.path.clone(),
                source,
            }
        })?;
        debug!(
            "ELF identification: class {}, data encoding {:?}",
            hdr.class, hdr.endianness
        );
        Ok(hdr)
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}
