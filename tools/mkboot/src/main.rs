//! # mkboot
//!
//! Packs a compiled 64-bit ELF kernel into images a virtual machine can boot:
//!
//! * `flat`: a Multiboot header followed by the kernel, for `qemu -kernel`.
//! * `iso`: a disc image holding the kernel and a GRUB configuration, made
//!   by the first installed authoring tool or, failing that, by a raw
//!   fallback layout with the kernel at offset `0x8000`.
//! * `all`: both, from a single read of the kernel.
//!
//! `inspect` verifies an existing image and `probe` lists the authoring
//! tools that would be used.

mod authoring;
mod config;
mod error;
mod grub;
mod kernel;
mod logger;
mod output;
mod pipeline;
mod probe;
mod staging;
#[cfg(test)]
mod testutil;

use crate::authoring::DiscAuthor;
use crate::config::{BuildConfig, ToolPolicy, parse_size};
use crate::logger::{StderrLogger, level_from_verbosity};
use crate::probe::{Availability, PathProbe};
use anyhow::{Context, Result};
use boot_image::elf::ExecutableHeader;
use boot_image::{FlatImage, SYSTEM_AREA_SIZE, find_header};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about = "Packs a 64-bit ELF kernel into bootable images")]
struct Cli {
    /// More output; repeat for trace level.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only report errors.
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a Multiboot flat image (header followed by the kernel).
    Flat {
        #[command(flatten)]
        kernel: KernelArgs,
        /// Output path of the flat image.
        #[arg(short, long, default_value = config::DEFAULT_FLAT_OUTPUT)]
        output: PathBuf,
    },
    /// Write a bootable disc image.
    Iso {
        #[command(flatten)]
        kernel: KernelArgs,
        #[command(flatten)]
        disc: DiscArgs,
        /// Output path of the disc image.
        #[arg(short, long, default_value = config::DEFAULT_DISC_OUTPUT)]
        output: PathBuf,
    },
    /// Write both the flat image and the disc image.
    All {
        #[command(flatten)]
        kernel: KernelArgs,
        #[command(flatten)]
        disc: DiscArgs,
        /// Output path of the flat image.
        #[arg(long, default_value = config::DEFAULT_FLAT_OUTPUT)]
        flat_output: PathBuf,
        /// Output path of the disc image.
        #[arg(long, default_value = config::DEFAULT_DISC_OUTPUT)]
        iso_output: PathBuf,
    },
    /// Verify the Multiboot header and payload of an existing image.
    Inspect {
        /// Flat image or raw disc image to check.
        image: PathBuf,
    },
    /// List the disc-authoring tools in priority order.
    Probe,
}

#[derive(Args)]
struct KernelArgs {
    /// Kernel executable (64-bit ELF).
    #[arg(short, long, default_value = config::DEFAULT_KERNEL_PATH)]
    kernel: PathBuf,
}

#[derive(Args)]
struct DiscArgs {
    /// Directory the disc sources are staged in; recreated on every build.
    #[arg(long, default_value = config::DEFAULT_STAGING_DIR)]
    staging_dir: PathBuf,
    /// Minimum size of a raw disc image, e.g. `100M` or `2000000`.
    #[arg(long, default_value = "100M", value_parser = parse_size)]
    min_size: usize,
    /// Skip external authoring tools and write the raw layout.
    #[arg(long)]
    raw: bool,
    /// GRUB menu entry title.
    #[arg(long, default_value = config::DEFAULT_MENU_TITLE)]
    title: String,
    /// GRUB menu timeout in seconds.
    #[arg(long, default_value_t = config::DEFAULT_MENU_TIMEOUT)]
    timeout: u32,
}

impl DiscArgs {
    fn apply(self, cfg: BuildConfig) -> BuildConfig {
        cfg.with_staging_dir(self.staging_dir)
            .with_minimum_disc_size(self.min_size)
            .with_tool_policy(if self.raw {
                ToolPolicy::RawOnly
            } else {
                ToolPolicy::PreferExternal
            })
            .with_menu_title(self.title)
            .with_menu_timeout(self.timeout)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    StderrLogger::new(level_from_verbosity(cli.verbose, cli.quiet))
        .init()
        .context("failed to install logger")?;

    let probe = PathProbe::from_env();

    match cli.command {
        Commands::Flat { kernel, output } => {
            let cfg = BuildConfig::default()
                .with_kernel_path(kernel.kernel)
                .with_flat_output(output);
            let image = pipeline::load_kernel(&cfg)?;
            pipeline::build_flat(image.bytes(), &cfg).context("flat image build failed")?;
        }
        Commands::Iso {
            kernel,
            disc,
            output,
        } => {
            let cfg = disc.apply(
                BuildConfig::default()
                    .with_kernel_path(kernel.kernel)
                    .with_disc_output(output),
            );
            let image = pipeline::load_kernel(&cfg)?;
            pipeline::build_disc(image.bytes(), &cfg, &probe).context("disc image build failed")?;
        }
        Commands::All {
            kernel,
            disc,
            flat_output,
            iso_output,
        } => {
            let cfg = disc.apply(
                BuildConfig::default()
                    .with_kernel_path(kernel.kernel)
                    .with_flat_output(flat_output)
                    .with_disc_output(iso_output),
            );
            let image = pipeline::load_kernel(&cfg)?;
            pipeline::build_all(image.bytes(), &cfg, &probe).context("image build failed")?;
        }
        Commands::Inspect { image } => match inspect(&image)? {
            Inspection::Flat {
                offset,
                payload_len,
            } => info!("Flat image: header at {offset:#x}, {payload_len} byte payload"),
            Inspection::RawLayout { payload_len } => {
                info!("Raw disc layout: {payload_len} bytes after the system area");
            }
        },
        Commands::Probe => {
            let author = DiscAuthor::with_default_tools(0);
            let mut found = false;
            for (tool, availability) in author.survey(&probe) {
                match availability {
                    Availability::Available(path) => {
                        found = true;
                        println!("{tool:<14} {}", path.display());
                    }
                    Availability::Unavailable => println!("{tool:<14} not found"),
                }
            }
            if !found {
                println!("{:<14} fallback", "raw layout");
            }
        }
    }

    Ok(())
}

/// What `inspect` recognized in an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inspection {
    /// A valid Multiboot header at `offset`, followed by the payload.
    Flat { offset: usize, payload_len: usize },
    /// A zeroed system area with the payload (and padding) behind it.
    RawLayout { payload_len: usize },
}

fn inspect(path: &Path) -> Result<Inspection> {
    let blob = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    info!("{}: {} bytes", path.display(), blob.len());

    if let Some((offset, hdr)) = find_header(&blob) {
        println!("multiboot header at {offset:#x}");
        println!("  magic    {:#010x}", hdr.magic);
        println!("  flags    {:#010x}", hdr.flags.into_bits());
        println!("  checksum {:#010x} (valid)", hdr.checksum);

        let flat = FlatImage::parse(&blob[offset..])?;
        describe_payload(flat.kernel());
        return Ok(Inspection::Flat {
            offset,
            payload_len: flat.kernel().len(),
        });
    }

    if blob.len() >= SYSTEM_AREA_SIZE && blob[..SYSTEM_AREA_SIZE].iter().all(|&b| b == 0) {
        println!("raw disc layout, payload at {SYSTEM_AREA_SIZE:#x}");
        let payload = &blob[SYSTEM_AREA_SIZE..];
        describe_payload(payload);
        return Ok(Inspection::RawLayout {
            payload_len: payload.len(),
        });
    }

    anyhow::bail!(
        "{}: no Multiboot header in the first 8 KiB and no raw disc layout",
        path.display()
    )
}

fn describe_payload(payload: &[u8]) {
    println!("  payload  {} bytes", payload.len());
    if payload.is_empty() {
        return;
    }
    match ExecutableHeader::parse(payload) {
        Ok(hdr) => match hdr.endianness {
            Some(data) => println!("  ELF64    {data:?} endian"),
            None => println!("  ELF64    (no data encoding byte)"),
        },
        Err(e) => println!("  payload is not a 64-bit ELF: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TempDir;
    use boot_image::{HEADER_SIZE, assemble, build_layout};

    const KERNEL: [u8; 8] = [0x7F, b'E', b'L', b'F', 0x02, 0x01, 0x01, 0x00];

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn inspect_finds_flat_image_header() {
        let dir = TempDir::new("inspect-flat");
        let path = write(&dir, "kernel-multiboot.bin", &assemble(&KERNEL));

        assert_eq!(
            inspect(&path).unwrap(),
            Inspection::Flat {
                offset: 0,
                payload_len: KERNEL.len(),
            }
        );
    }

    #[test]
    fn inspect_finds_header_at_aligned_offset() {
        let dir = TempDir::new("inspect-offset");
        let mut blob = vec![0xCC; 16];
        blob.extend_from_slice(&assemble(&KERNEL));
        let path = write(&dir, "shifted.bin", &blob);

        assert_eq!(
            inspect(&path).unwrap(),
            Inspection::Flat {
                offset: 16,
                payload_len: KERNEL.len(),
            }
        );
        assert_eq!(blob.len(), 16 + HEADER_SIZE + KERNEL.len());
    }

    #[test]
    fn inspect_recognizes_raw_layout() {
        let dir = TempDir::new("inspect-raw");
        let path = write(&dir, "raw.iso", &build_layout(&KERNEL, 64 * 1024));

        assert_eq!(
            inspect(&path).unwrap(),
            Inspection::RawLayout {
                payload_len: 64 * 1024 - SYSTEM_AREA_SIZE,
            }
        );
    }

    #[test]
    fn inspect_accepts_raw_layout_of_empty_kernel() {
        let dir = TempDir::new("inspect-raw-empty");
        let layout = build_layout(&[], 0);
        assert_eq!(layout.len(), SYSTEM_AREA_SIZE);
        let path = write(&dir, "empty.iso", &layout);

        assert_eq!(
            inspect(&path).unwrap(),
            Inspection::RawLayout { payload_len: 0 }
        );
    }

    #[test]
    fn inspect_rejects_unknown_images() {
        let dir = TempDir::new("inspect-neither");
        let path = write(&dir, "kernel.elf", &KERNEL);
        assert!(inspect(&path).is_err());

        let mut short = vec![0u8; SYSTEM_AREA_SIZE - 1];
        short.push(0xFF);
        let path = write(&dir, "short.iso", &short);
        assert!(inspect(&path).is_err());
    }

    #[test]
    fn inspect_reports_missing_file() {
        let dir = TempDir::new("inspect-missing");
        assert!(inspect(&dir.path().join("nope.iso")).is_err());
    }

    #[test]
    fn raw_flag_and_min_size_reach_the_config() {
        let cli = Cli::try_parse_from(["mkboot", "iso", "--raw", "--min-size", "2M"]).unwrap();
        let Commands::Iso { disc, output, .. } = cli.command else {
            panic!("expected the iso command");
        };
        let cfg = disc.apply(BuildConfig::default());

        assert_eq!(cfg.tool_policy(), ToolPolicy::RawOnly);
        assert_eq!(cfg.minimum_disc_size(), 2 * 1024 * 1024);
        assert_eq!(output, PathBuf::from(config::DEFAULT_DISC_OUTPUT));
    }

    #[test]
    fn disc_defaults_prefer_external_tools() {
        let cli = Cli::try_parse_from(["mkboot", "all", "--title", "Test OS"]).unwrap();
        let Commands::All { disc, .. } = cli.command else {
            panic!("expected the all command");
        };
        let cfg = disc.apply(BuildConfig::default());

        assert_eq!(cfg.tool_policy(), ToolPolicy::PreferExternal);
        assert_eq!(cfg.minimum_disc_size(), boot_image::DEFAULT_MINIMUM_SIZE);
        assert_eq!(cfg.menu_title(), "Test OS");
    }

    #[test]
    fn bad_min_size_is_a_usage_error() {
        assert!(Cli::try_parse_from(["mkboot", "iso", "--min-size", "lots"]).is_err());
    }
}
