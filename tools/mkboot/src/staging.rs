//! # Disc Source Directory
//!
//! Authoring tools build the disc from a directory tree:
//!
//! ```text
//! <staging>/
//! └── boot/
//!     ├── kernel           the kernel, byte for byte
//!     └── grub/
//!         └── grub.cfg     menu entry loading /boot/kernel
//! ```
//!
//! The root is wiped before every build, so it is only cleared when it is
//! empty or carries the [`STAGING_MARKER`] left by an earlier build. A root
//! holding the working directory is never cleared.

use crate::error::BuildError;
use crate::grub::GrubConfig;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Kernel location relative to the staging root.
pub const KERNEL_REL_PATH: &str = "boot/kernel";

/// GRUB configuration location relative to the staging root.
pub const GRUB_CFG_REL_PATH: &str = "boot/grub/grub.cfg";

/// Empty file marking a directory as created by [`stage`].
pub const STAGING_MARKER: &str = ".mkboot-staging";

/// A populated staging directory.
#[derive(Debug, Clone)]
pub struct StagedSource {
    pub root: PathBuf,
    pub kernel: PathBuf,
    pub grub_cfg: PathBuf,
}

/// Recreates `root` from scratch and fills it with the kernel and the GRUB
/// configuration.
///
/// # Errors
/// [`BuildError::StagingDirRefused`] if `root` may not be cleared (see
/// [`ensure_clearable`]), [`BuildError::StagingFailed`] naming the path that
/// could not be removed, created or written.
pub fn stage(root: &Path, kernel: &[u8], grub: &GrubConfig<'_>) -> Result<StagedSource, BuildError> {
    let staged = StagedSource {
        root: root.to_path_buf(),
        kernel: root.join(KERNEL_REL_PATH),
        grub_cfg: root.join(GRUB_CFG_REL_PATH),
    };

    let at = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BuildError::StagingFailed { path, source }
    };

    let cwd = env::current_dir().map_err(at(root))?;
    ensure_clearable(root, &cwd)?;
    match fs::remove_dir_all(root) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(at(root)(e)),
        _ => {}
    }

    let grub_dir = staged.grub_cfg.parent().unwrap_or(root);
    fs::create_dir_all(grub_dir).map_err(at(grub_dir))?;
    let marker = root.join(STAGING_MARKER);
    fs::write(&marker, b"").map_err(at(&marker))?;
    fs::write(&staged.kernel, kernel).map_err(at(&staged.kernel))?;
    fs::write(&staged.grub_cfg, grub.render()).map_err(at(&staged.grub_cfg))?;

    info!("Staged disc sources in {}", root.display());
    Ok(staged)
}

/// Checks that `root` may be removed before staging.
///
/// A missing root is fine. An existing root is refused if `cwd` lies inside
/// it, or if it has entries but no [`STAGING_MARKER`].
///
/// # Errors
/// [`BuildError::StagingDirRefused`] for the cases above,
/// [`BuildError::StagingFailed`] if `root` cannot be inspected.
pub fn ensure_clearable(root: &Path, cwd: &Path) -> Result<(), BuildError> {
    let refuse = |reason| BuildError::StagingDirRefused {
        path: root.to_path_buf(),
        reason,
    };
    let failed = |source| BuildError::StagingFailed {
        path: root.to_path_buf(),
        source,
    };

    let resolved = match root.canonicalize() {
        Ok(p) => p,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(failed(e)),
    };

    let cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
    if cwd.starts_with(&resolved) {
        return Err(refuse("it contains the working directory"));
    }

    if resolved.join(STAGING_MARKER).is_file() {
        debug!("Clearing previous staging directory {}", resolved.display());
        return Ok(());
    }

    let mut entries = fs::read_dir(&resolved).map_err(failed)?;
    if entries.next().is_some() {
        return Err(refuse("it is not empty and was not created by mkboot"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TempDir;

    fn grub() -> GrubConfig<'static> {
        GrubConfig {
            default_entry: 0,
            timeout: 2,
            title: "test",
            kernel_path: "/boot/kernel",
        }
    }

    #[test]
    fn lays_out_kernel_and_config() {
        let dir = TempDir::new("staging");
        let root = dir.path().join("iso-boot");

        let staged = stage(&root, b"\x7fELF\x02", &grub()).unwrap();

        assert_eq!(staged.kernel, root.join("boot/kernel"));
        assert_eq!(fs::read(&staged.kernel).unwrap(), b"\x7fELF\x02");
        let cfg = fs::read_to_string(&staged.grub_cfg).unwrap();
        assert!(cfg.contains("multiboot /boot/kernel"));
    }

    #[test]
    fn previous_contents_are_removed() {
        let dir = TempDir::new("staging-stale");
        let root = dir.path().join("iso-boot");
        stage(&root, b"old", &grub()).unwrap();
        assert!(root.join(STAGING_MARKER).is_file());
        fs::write(root.join("stale.txt"), b"old").unwrap();

        stage(&root, b"k", &grub()).unwrap();

        assert!(!root.join("stale.txt").exists());
        assert_eq!(fs::read(root.join(KERNEL_REL_PATH)).unwrap(), b"k");
    }

    #[test]
    fn empty_unmarked_directory_is_reused() {
        let dir = TempDir::new("staging-empty");
        let root = dir.path().join("iso-boot");
        fs::create_dir_all(&root).unwrap();

        stage(&root, b"k", &grub()).unwrap();
        assert!(root.join(KERNEL_REL_PATH).is_file());
    }

    #[test]
    fn unmarked_directory_with_contents_is_left_alone() {
        let dir = TempDir::new("staging-foreign");
        let root = dir.path().join("src");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("main.rs"), b"fn main() {}").unwrap();

        let err = stage(&root, b"k", &grub()).unwrap_err();

        assert!(matches!(err, BuildError::StagingDirRefused { .. }));
        assert_eq!(fs::read(root.join("main.rs")).unwrap(), b"fn main() {}");
        assert!(!root.join(KERNEL_REL_PATH).exists());
    }

    #[test]
    fn working_directory_and_its_ancestors_are_refused() {
        let dir = TempDir::new("staging-cwd");
        let cwd = dir.path().join("project/build");
        fs::create_dir_all(&cwd).unwrap();
        fs::write(dir.path().join(STAGING_MARKER), b"").unwrap();

        for root in [cwd.clone(), dir.path().join("project"), dir.path().to_path_buf()] {
            let err = ensure_clearable(&root, &cwd).unwrap_err();
            assert!(
                matches!(err, BuildError::StagingDirRefused { .. }),
                "{} was not refused",
                root.display()
            );
        }
        assert!(ensure_clearable(&dir.path().join("project/other"), &cwd).is_ok());
    }

    #[test]
    fn current_directory_is_refused() {
        let cwd = env::current_dir().unwrap();
        let err = ensure_clearable(Path::new("."), &cwd).unwrap_err();
        assert!(matches!(err, BuildError::StagingDirRefused { .. }));
    }
}
