//! # Disc Image Authoring
//!
//! Disc images are produced by the first strategy whose tool is installed,
//! in priority order:
//!
//! 1. `grub-mkrescue`: a GRUB rescue image, bootable on BIOS and UEFI.
//! 2. `xorriso`: an El Torito image in `mkisofs` emulation mode.
//! 3. `mkisofs`: a plain Rock Ridge/Joliet image of the staging tree.
//! 4. [`RawLayout`]: the built-in fallback from [`boot_image::disc`].
//!
//! External tools write to a partial file that is renamed over the output
//! only if the tool exits successfully.

use crate::error::BuildError;
use crate::output::{ensure_parent, partial_path, write_artifact};
use crate::probe::{Availability, ToolProbe};
use crate::staging::StagedSource;
use boot_image::RawDiscLayout;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Everything a strategy needs to produce one disc image.
#[derive(Debug)]
pub struct DiscJob<'a> {
    pub source: &'a StagedSource,
    pub kernel: &'a [u8],
    pub output: &'a Path,
}

pub trait DiscAuthoring {
    /// Program name looked up by the [`ToolProbe`].
    fn tool(&self) -> &'static str;

    /// Arguments for producing `output` from the staging tree of `job`.
    fn args(&self, job: &DiscJob<'_>, output: &Path) -> Vec<String>;

    /// Runs `program` and moves its result into place.
    ///
    /// # Errors
    /// [`BuildError::ToolSpawnFailed`] or [`BuildError::ToolFailed`] if the
    /// tool could not be run or reported failure; [`BuildError::OutputWriteFailed`]
    /// if its result could not be moved into place.
    fn produce_disc_image(&self, job: &DiscJob<'_>, program: &Path) -> Result<(), BuildError> {
        ensure_parent(job.output)?;
        let partial = partial_path(job.output);

        let mut cmd = Command::new(program);
        cmd.args(self.args(job, &partial));
        info!("Running {}", self.tool());
        debug!("{cmd:?}");

        let result = match cmd.status() {
            Err(source) => Err(BuildError::ToolSpawnFailed {
                tool: self.tool(),
                source,
            }),
            Ok(status) if !status.success() => Err(BuildError::ToolFailed {
                tool: self.tool(),
                status,
            }),
            Ok(_) => fs::rename(&partial, job.output).map_err(|source| {
                BuildError::OutputWriteFailed {
                    path: job.output.to_path_buf(),
                    source,
                }
            }),
        };

        if result.is_err() {
            let _ = fs::remove_file(&partial);
        }
        result
    }
}

fn lossy(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub struct GrubMkrescue;

impl DiscAuthoring for GrubMkrescue {
    fn tool(&self) -> &'static str {
        "grub-mkrescue"
    }

    fn args(&self, job: &DiscJob<'_>, output: &Path) -> Vec<String> {
        vec!["-o".into(), lossy(output), lossy(&job.source.root)]
    }
}

pub struct Xorriso;

impl DiscAuthoring for Xorriso {
    fn tool(&self) -> &'static str {
        "xorriso"
    }

    fn args(&self, job: &DiscJob<'_>, output: &Path) -> Vec<String> {
        let output = lossy(output);
        let root = lossy(&job.source.root);
        Vec::from([
            "-as",
            "mkisofs",
            "-o",
            output.as_str(),
            "-c",
            "boot/bootcat.img",
            "-b",
            "boot/grub/stage2_eltorito",
            "-no-emul-boot",
            "-boot-load-size",
            "4",
            "-boot-info-table",
            root.as_str(),
        ])
        .into_iter()
        .map(String::from)
        .collect()
    }
}

/// Produces a data-only image; the result is not bootable from firmware.
pub struct Mkisofs;

impl DiscAuthoring for Mkisofs {
    fn tool(&self) -> &'static str {
        "mkisofs"
    }

    fn args(&self, job: &DiscJob<'_>, output: &Path) -> Vec<String> {
        vec![
            "-o".into(),
            lossy(output),
            "-R".into(),
            "-J".into(),
            lossy(&job.source.root),
        ]
    }
}

/// Built-in fallback writing [`boot_image::build_layout`] directly.
///
/// The result is not a standards-conformant disc image; only loaders that
/// read the kernel from [`boot_image::SYSTEM_AREA_SIZE`] can use it.
pub struct RawLayout {
    pub minimum_size: usize,
}

impl RawLayout {
    /// # Errors
    /// [`BuildError::OutputWriteFailed`] if the image cannot be written.
    pub fn produce_disc_image(&self, job: &DiscJob<'_>) -> Result<(), BuildError> {
        let layout = RawDiscLayout::plan(job.kernel.len(), self.minimum_size);
        info!(
            "Writing raw disc layout: kernel at {:#x}, {} bytes of padding",
            layout.kernel.start,
            layout.padding_len()
        );
        write_artifact(job.output, &boot_image::build_layout(job.kernel, self.minimum_size))
    }
}

/// Strategy that produced a disc image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Produced {
    External { tool: &'static str, program: PathBuf },
    RawLayout,
}

/// The ordered strategy list plus the raw fallback.
pub struct DiscAuthor {
    external: Vec<Box<dyn DiscAuthoring>>,
    fallback: RawLayout,
}

impl DiscAuthor {
    /// `grub-mkrescue`, `xorriso`, `mkisofs`, then the raw layout.
    #[must_use]
    pub fn with_default_tools(minimum_size: usize) -> Self {
        Self::raw_only(minimum_size)
            .with_tool(GrubMkrescue)
            .with_tool(Xorriso)
            .with_tool(Mkisofs)
    }

    /// Only the raw layout.
    #[must_use]
    pub const fn raw_only(minimum_size: usize) -> Self {
        Self {
            external: Vec::new(),
            fallback: RawLayout { minimum_size },
        }
    }

    /// Appends a lower-priority external strategy.
    #[must_use]
    pub fn with_tool(mut self, tool: impl DiscAuthoring + 'static) -> Self {
        self.external.push(Box::new(tool));
        self
    }

    /// Probes every external tool in priority order.
    pub fn survey<'p>(
        &'p self,
        probe: &'p dyn ToolProbe,
    ) -> impl Iterator<Item = (&'static str, Availability)> + 'p {
        self.external
            .iter()
            .map(move |s| (s.tool(), probe.probe_tool(s.tool())))
    }

    /// First external strategy whose tool is installed.
    ///
    /// # Errors
    /// [`BuildError::NoAuthoringToolAvailable`] if none is.
    pub fn select(
        &self,
        probe: &dyn ToolProbe,
    ) -> Result<(&dyn DiscAuthoring, PathBuf), BuildError> {
        self.external
            .iter()
            .find_map(|s| match probe.probe_tool(s.tool()) {
                Availability::Available(program) => Some((s.as_ref(), program)),
                Availability::Unavailable => {
                    debug!("{} not found", s.tool());
                    None
                }
            })
            .ok_or(BuildError::NoAuthoringToolAvailable)
    }

    /// Produces the disc image with the selected strategy, falling back to
    /// the raw layout when no tool is installed. A tool that is found but
    /// fails is reported, not papered over.
    ///
    /// # Errors
    /// Any [`BuildError`] from the strategy that ran.
    pub fn produce(&self, job: &DiscJob<'_>, probe: &dyn ToolProbe) -> Result<Produced, BuildError> {
        match self.select(probe) {
            Ok((strategy, program)) => {
                strategy.produce_disc_image(job, &program)?;
                Ok(Produced::External {
                    tool: strategy.tool(),
                    program,
                })
            }
            Err(BuildError::NoAuthoringToolAvailable) => {
                if !self.external.is_empty() {
                    warn!("No disc-authoring tool found; falling back to the raw layout");
                }
                self.fallback.produce_disc_image(job)?;
                Ok(Produced::RawLayout)
            }
            Err(e) => Err(e),
        }
    }
}
