use crate::error::BuildError;
use log::debug;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Sibling path an artifact is written to before it is moved into place.
#[must_use]
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map_or_else(OsString::new, OsString::from);
    name.push(".partial");
    path.with_file_name(name)
}

/// Creates the parent directory of `path`, if it has one.
///
/// # Errors
/// [`BuildError::OutputWriteFailed`] if the directory cannot be created.
pub fn ensure_parent(path: &Path) -> Result<(), BuildError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|source| BuildError::OutputWriteFailed {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Writes a fully assembled artifact. The bytes go to [`partial_path`]
/// first and are renamed over `path` only once completely written, so a
/// failed write never leaves a truncated artifact at `path`.
///
/// # Errors
/// [`BuildError::OutputWriteFailed`] with the path that failed.
pub fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), BuildError> {
    ensure_parent(path)?;

    let partial = partial_path(path);
    let fail = |source| {
        let _ = fs::remove_file(&partial);
        BuildError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        }
    };

    fs::write(&partial, bytes).map_err(fail)?;
    fs::rename(&partial, path).map_err(fail)?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TempDir;

    #[test]
    fn partial_path_is_a_sibling() {
        assert_eq!(
            partial_path(Path::new("out/disc.iso")),
            PathBuf::from("out/disc.iso.partial")
        );
    }

    #[test]
    fn writes_and_replaces() {
        let dir = TempDir::new("output-replace");
        let path = dir.path().join("nested").join("image.bin");

        write_artifact(&path, b"first").unwrap();
        write_artifact(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = TempDir::new("output-fail");
        // The target is an existing directory, so the rename must fail.
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let err = write_artifact(&path, b"data").unwrap_err();
        assert!(matches!(err, BuildError::OutputWriteFailed { .. }));
        assert!(!partial_path(&path).exists());
        assert!(path.is_dir());
    }
}
