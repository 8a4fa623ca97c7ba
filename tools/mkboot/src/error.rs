use boot_image::ValidationError;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Failures of a single build path.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("kernel not found: {}", path.display())]
    InputNotFound { path: PathBuf },
    #[error("failed to read kernel {}", path.display())]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not a loadable 64-bit kernel", path.display())]
    InvalidKernel {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
    #[error("failed to write {}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to stage disc sources in {}", path.display())]
    StagingFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("refusing to clear staging directory {}: {reason}", path.display())]
    StagingDirRefused { path: PathBuf, reason: &'static str },
    /// Informational; the disc path recovers by using the raw layout.
    #[error("no disc-authoring tool available")]
    NoAuthoringToolAvailable,
    #[error("failed to run {tool}")]
    ToolSpawnFailed {
        tool: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{tool} exited with {status}")]
    ToolFailed {
        tool: &'static str,
        status: ExitStatus,
    },
}
