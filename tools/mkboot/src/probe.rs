//! # Tool Discovery
//!
//! Whether an external program can be used is answered by a [`ToolProbe`],
//! so the choice between authoring tools and the raw fallback is a plain
//! branch on the result and can be tested with a fake probe.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available(PathBuf),
    Unavailable,
}

pub trait ToolProbe {
    fn probe_tool(&self, name: &str) -> Availability;
}

/// Looks up programs in the directories of a `PATH`-style search list.
#[derive(Debug, Clone)]
pub struct PathProbe {
    search_path: Option<OsString>,
}

impl PathProbe {
    /// Probes the `PATH` of the current process.
    #[must_use]
    pub fn from_env() -> Self {
        env::var_os("PATH").map_or(Self { search_path: None }, Self::with_search_path)
    }

    #[must_use]
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }
}

impl ToolProbe for PathProbe {
    fn probe_tool(&self, name: &str) -> Availability {
        let Some(search_path) = &self.search_path else {
            return Availability::Unavailable;
        };

        env::split_paths(search_path)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.join(name))
            .find(|candidate| is_executable(candidate))
            .map_or(Availability::Unavailable, Availability::Available)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|md| md.is_file() && md.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
