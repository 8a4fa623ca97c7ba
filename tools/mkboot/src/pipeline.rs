//! # Build Paths
//!
//! ```text
//! KernelImage::load ──► validate ──┬──► flat::assemble ──► write_artifact
//!                                  │
//!                                  └──► stage ──► DiscAuthor::produce
//! ```
//!
//! Both paths read the same immutable kernel buffer. Nothing is written
//! before the kernel has been loaded and validated.

use crate::authoring::{DiscAuthor, DiscJob, Produced};
use crate::config::{BuildConfig, ToolPolicy};
use crate::error::BuildError;
use crate::grub::GrubConfig;
use crate::kernel::KernelImage;
use crate::output::write_artifact;
use crate::probe::ToolProbe;
use crate::staging::{self, KERNEL_REL_PATH};
use log::info;
use std::path::{Path, PathBuf};
use std::{fs, thread};

/// A written output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
}

impl Artifact {
    fn from_written(path: &Path) -> Result<Self, BuildError> {
        let size = fs::metadata(path)
            .map_err(|source| BuildError::OutputWriteFailed {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        Ok(Self {
            path: path.to_path_buf(),
            size,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn size_mib(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

/// Loads the configured kernel and rejects anything but a 64-bit ELF.
///
/// # Errors
/// [`BuildError::InputNotFound`], [`BuildError::InputReadFailed`] or
/// [`BuildError::InvalidKernel`].
pub fn load_kernel(config: &BuildConfig) -> Result<KernelImage, BuildError> {
    let kernel = KernelImage::load(config.kernel_path())?;
    kernel.validate()?;
    Ok(kernel)
}

/// Writes the Multiboot flat image of an already validated kernel.
///
/// # Errors
/// [`BuildError::OutputWriteFailed`] if the image cannot be written.
pub fn build_flat(kernel: &[u8], config: &BuildConfig) -> Result<Artifact, BuildError> {
    let image = boot_image::assemble(kernel);
    write_artifact(config.flat_output(), &image)?;

    let artifact = Artifact {
        path: config.flat_output().clone(),
        size: image.len() as u64,
    };
    info!(
        "Flat image {} ({} bytes)",
        artifact.path.display(),
        artifact.size
    );
    info!(
        "Boot it with: qemu-system-x86_64 -kernel {} -m 512 -serial stdio",
        artifact.path.display()
    );
    Ok(artifact)
}

/// Stages the disc sources and produces the disc image, preferring
/// installed authoring tools as allowed by the configuration.
///
/// # Errors
/// [`BuildError::StagingFailed`] or any error of the strategy that ran.
pub fn build_disc(
    kernel: &[u8],
    config: &BuildConfig,
    probe: &dyn ToolProbe,
) -> Result<(Artifact, Produced), BuildError> {
    let grub_kernel_path = format!("/{KERNEL_REL_PATH}");
    let grub = GrubConfig {
        default_entry: 0,
        timeout: config.menu_timeout(),
        title: config.menu_title(),
        kernel_path: &grub_kernel_path,
    };

    let author = match config.tool_policy() {
        ToolPolicy::PreferExternal => DiscAuthor::with_default_tools(config.minimum_disc_size()),
        ToolPolicy::RawOnly => DiscAuthor::raw_only(config.minimum_disc_size()),
    };

    let source = staging::stage(config.staging_dir(), kernel, &grub)?;
    let job = DiscJob {
        source: &source,
        kernel,
        output: config.disc_output(),
    };
    let produced = author.produce(&job, probe)?;
    if let Produced::External { tool, program } = &produced {
        info!("Disc image authored by {tool} ({})", program.display());
    }

    let artifact = Artifact::from_written(config.disc_output())?;
    info!(
        "Disc image {} ({:.1} MiB)",
        artifact.path.display(),
        artifact.size_mib()
    );
    info!(
        "Boot it with: qemu-system-x86_64 -cdrom {} -m 512 -serial stdio",
        artifact.path.display()
    );
    Ok((artifact, produced))
}

/// Builds the flat image on a scoped thread while the disc image is built on
/// the calling thread. Both borrow the same kernel buffer.
///
/// # Errors
/// The first error of either path; the flat image error wins if both fail.
pub fn build_all(
    kernel: &[u8],
    config: &BuildConfig,
    probe: &dyn ToolProbe,
) -> Result<(Artifact, Artifact, Produced), BuildError> {
    thread::scope(|s| {
        let flat = s.spawn(move || build_flat(kernel, config));
        let disc = build_disc(kernel, config, probe);

        let flat = match flat.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        let flat = flat?;
        let (disc, produced) = disc?;
        Ok((flat, disc, produced))
    })
}
