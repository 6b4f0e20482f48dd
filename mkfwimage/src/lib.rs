//! # mkfwimage
//!
//! Builds flashable firmware images in the Ubiquiti `OPEN`/`PART`/`END.`
//! container format from a kernel, a root filesystem and an optional
//! configuration filesystem.
//!
//! The layout is taken from a compiled-in board profile. Every partition is
//! framed with its own CRC32 and the whole image is sealed by a trailing
//! signature record.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mkfwimage::{Board, BuildRequest, FsProbe, ImageWriter, LogReporter};
//!
//! let request = BuildRequest::new(Board::Xs2, "vmlinux.lzma", "rootfs.squashfs")
//!     .version("XS2.ar2316.v3.2")
//!     .output("firmware.bin");
//!
//! let writer = ImageWriter::new(&FsProbe, &LogReporter);
//! let plan = writer.build(&request)?;
//! println!("wrote {} partitions", plan.partitions().len());
//! # Ok::<(), mkfwimage::FwImageError>(())
//! ```

pub mod board;
pub mod builder;
pub mod cli;
pub mod crc;
pub mod error;
pub mod image_header;
pub mod layout;
pub mod logger;
pub mod probe;
pub mod report;
pub mod validate;
pub mod writer;

pub use board::{Board, BoardProfile};
pub use builder::{FirmwareImage, ParsedPartition, serialize};
pub use crc::calculate_crc32;
pub use error::{FwImageError, Result};
pub use image_header::{ImageHeader, PartitionCrc, PartitionHeader, Signature};
pub use layout::{CfgRequest, ImagePlan, PartitionDescriptor, plan};
pub use probe::{FileProbe, FsProbe};
pub use report::{LogReporter, NullReporter, Reporter};
pub use validate::validate;
pub use writer::{BuildRequest, ImageWriter, write_image};

/// Current version of the mkfwimage implementation
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Width of every record magic tag
pub const MAGIC_LENGTH: usize = 4;

/// Magic tag opening the image header
pub const MAGIC_HEADER: &[u8; MAGIC_LENGTH] = b"OPEN";

/// Magic tag opening every partition record
pub const MAGIC_PART: &[u8; MAGIC_LENGTH] = b"PART";

/// Magic tag opening the trailing signature record
pub const MAGIC_END: &[u8; MAGIC_LENGTH] = b"END.";

/// Maximum number of partitions an image may carry
pub const MAX_PARTITIONS: usize = 8;

/// Version string written when none is supplied
pub const DEFAULT_VERSION: &str = "UNKNOWN";

/// Output file name used when none is supplied
pub const DEFAULT_OUTPUT_FILE: &str = "firmware-image.bin";

/// Board layout used when none is supplied
pub const DEFAULT_BOARD: Board = Board::Xs2;
