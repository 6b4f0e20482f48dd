//! Command line interface for mkfwimage

use crate::board::Board;
use crate::builder::FirmwareImage;
use crate::error::{FwImageError, Result};
use crate::probe::FsProbe;
use crate::report::LogReporter;
use crate::writer::{BuildRequest, ImageWriter};
use crate::{DEFAULT_OUTPUT_FILE, DEFAULT_VERSION, VERSION};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Command line arguments for mkfwimage
#[derive(Parser, Debug)]
#[command(name = "mkfwimage")]
#[command(version = VERSION)]
#[command(about = "Build OPEN/PART/END. firmware images for Ubiquiti boards", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Quiet mode - only output errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a firmware image
    Create(CreateArgs),
    /// Print the records of an existing image
    List(ListArgs),
    /// Check every CRC of an existing image
    Verify(VerifyArgs),
    /// Print the supported board layouts
    Boards,
}

/// Arguments for creating an image
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Board layout (XS2, XS5, RS, RSPRO, LS-SR71, XS2-8, XM, PB42)
    #[arg(short = 'B', long, default_value = "XS2")]
    pub board: String,

    /// Kernel file
    #[arg(short = 'k', long)]
    pub kernel: PathBuf,

    /// Rootfs file
    #[arg(short = 'r', long)]
    pub rootfs: PathBuf,

    /// Enable the 'cfg' partition; size in bytes
    #[arg(short = 'C', long, value_parser = parse_hex_u32, requires = "cfg")]
    pub cfg_size: Option<u32>,

    /// Configfs file
    #[arg(short = 'c', long, requires = "cfg_size")]
    pub cfg: Option<PathBuf>,

    /// Firmware version information
    #[arg(short = 'v', long = "version-string", default_value = DEFAULT_VERSION)]
    pub version_string: String,

    /// Firmware output file
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,
}

impl TryFrom<CreateArgs> for BuildRequest {
    type Error = FwImageError;

    fn try_from(args: CreateArgs) -> Result<Self> {
        let board = Board::lookup(&args.board)?;
        let mut request = BuildRequest::new(board, args.kernel, args.rootfs)
            .version(args.version_string)
            .output(args.output);
        if let (Some(path), Some(size)) = (args.cfg, args.cfg_size) {
            request = request.cfg(path, size);
        }
        Ok(request)
    }
}

/// Arguments for listing image information
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Image file to examine
    pub image_file: PathBuf,
}

/// Arguments for verifying an image
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Image file to verify
    pub image_file: PathBuf,
}

/// Parse decimal or `0x` prefixed hexadecimal string to u32
fn parse_hex_u32(s: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse::<u32>()
    }
}

/// Main CLI handler
pub fn run_cli(args: Args) -> Result<()> {
    match args.command {
        Commands::Create(create_args) => handle_create(create_args),
        Commands::List(list_args) => handle_list(list_args),
        Commands::Verify(verify_args) => handle_verify(verify_args),
        Commands::Boards => {
            handle_boards();
            Ok(())
        }
    }
}

fn handle_create(args: CreateArgs) -> Result<()> {
    let request = BuildRequest::try_from(args)?;
    log::debug!("Creating firmware image: {request:?}");

    let plan = ImageWriter::new(&FsProbe, &LogReporter).build(&request)?;

    log::info!(
        "Firmware image created successfully: {}",
        plan.get_output().display()
    );
    Ok(())
}

fn read_image(path: &Path) -> Result<FirmwareImage> {
    log::debug!("Reading image: {}", path.display());
    let data = std::fs::read(path)?;
    FirmwareImage::from_bytes(&data)
}

fn handle_list(args: ListArgs) -> Result<()> {
    let image = read_image(&args.image_file)?;
    println!("{}", image.summary());
    Ok(())
}

fn handle_verify(args: VerifyArgs) -> Result<()> {
    let image = read_image(&args.image_file)?;

    log::info!("Header CRC32: 0x{:08x} - OK", image.header.crc);
    for part in &image.partitions {
        log::info!(
            "Part {} '{}' CRC32: 0x{:08x} - OK",
            part.header.index,
            part.header.name,
            part.crc
        );
    }
    log::info!("Signature CRC32: 0x{:08x} - OK", image.signature.crc);
    log::info!("Image verification successful");
    Ok(())
}

fn handle_boards() {
    for board in Board::ALL {
        println!("{}", board.profile());
    }
}
