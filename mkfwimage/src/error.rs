//! Error types for firmware image creation

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, FwImageError>;

/// Everything that can stop an image from being planned, validated,
/// serialized, written or parsed back.
#[derive(Debug, Error)]
pub enum FwImageError {
    #[error("unknown board '{name}'")]
    UnknownBoard { name: String },

    #[error(
        "kernel ({kernel} bytes) and rootfs ({rootfs} bytes) exceed the board limit of 0x{max:08X} bytes"
    )]
    KernelTooLarge { kernel: u64, rootfs: u64, max: u32 },

    #[error("cfg partition of {cfg} bytes does not fit in the {available} bytes left for rootfs")]
    CfgTooLarge { cfg: u32, available: u32 },

    #[error("address of partition '{partition}' overflows 32 bits")]
    AddressOverflow { partition: String },

    #[error("invalid part count '{count}'")]
    InvalidPartitionCount { count: usize },

    #[error("invalid partition name '{name}' of the part {index}")]
    InvalidPartitionName { index: u32, name: String },

    #[error("couldn't stat file '{}' from part '{partition}': {source}", .path.display())]
    FileNotFound {
        partition: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file '{}' from part '{partition}' is empty", .path.display())]
    EmptyFile { partition: String, path: PathBuf },

    #[error(
        "file '{}' too big ({size}) - max size: 0x{max:08X} (exceeds {excess} bytes)",
        .path.display()
    )]
    FileTooLarge {
        partition: String,
        path: PathBuf,
        size: u64,
        max: u32,
        excess: u64,
    },

    #[error("failed writing part {index} '{name}' from '{}': {source}", .path.display())]
    PartWriteError {
        index: u32,
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not write {expected} bytes, only {written} were written")]
    WriteError { expected: usize, written: usize },

    #[error("can not create output file '{}': {source}", .path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid {record} magic: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        record: &'static str,
        expected: String,
        found: String,
    },

    #[error("{record} record truncated at offset {offset}: need {needed} bytes, {available} left")]
    Truncated {
        record: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("{record} CRC mismatch: stored 0x{stored:08x}, calculated 0x{calculated:08x}")]
    CrcMismatch {
        record: String,
        stored: u32,
        calculated: u32,
    },

    #[error("{len} unexpected bytes after the signature record")]
    TrailingData { len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FwImageError {
    pub fn invalid_magic(record: &'static str, expected: &[u8], found: &[u8]) -> Self {
        Self::InvalidMagic {
            record,
            expected: String::from_utf8_lossy(expected).into_owned(),
            found: String::from_utf8_lossy(found).into_owned(),
        }
    }

    pub fn crc_mismatch(record: impl Into<String>, stored: u32, calculated: u32) -> Self {
        Self::CrcMismatch {
            record: record.into(),
            stored,
            calculated,
        }
    }

    /// Process exit status for this failure.
    ///
    /// 3 layout planning, 4 validation, 5 build or write, 6 parsing an
    /// existing image. Status 2 is left to the argument parser.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::UnknownBoard { .. }
            | Self::KernelTooLarge { .. }
            | Self::CfgTooLarge { .. }
            | Self::AddressOverflow { .. } => 3,
            Self::InvalidPartitionCount { .. }
            | Self::InvalidPartitionName { .. }
            | Self::FileNotFound { .. }
            | Self::EmptyFile { .. }
            | Self::FileTooLarge { .. } => 4,
            Self::PartWriteError { .. }
            | Self::WriteError { .. }
            | Self::CreateOutput { .. }
            | Self::Io(_) => 5,
            Self::InvalidMagic { .. }
            | Self::Truncated { .. }
            | Self::CrcMismatch { .. }
            | Self::TrailingData { .. } => 6,
        }
    }
}
