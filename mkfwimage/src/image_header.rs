//! On-disk records of the firmware container and their serialization
//!
//! All integers are stored big-endian. Text fields have a fixed width: at
//! most that many bytes are copied and the remainder is zero filled, so a
//! field that is exactly full carries no terminator.

use crate::crc::calculate_crc32;
use crate::error::{FwImageError, Result};
use crate::{MAGIC_END, MAGIC_HEADER, MAGIC_LENGTH, MAGIC_PART};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// Width of the header version field
pub const VERSION_LENGTH: usize = 256;

/// Width of the partition name field
pub const PART_NAME_LENGTH: usize = 16;

/// Reserved bytes following the partition name
pub const PART_RESERVED_LENGTH: usize = 12;

/// Image header size: magic, version, crc, pad
pub const HEADER_SIZE: usize = MAGIC_LENGTH + VERSION_LENGTH + 8;

/// Bytes of the image header covered by its CRC
pub const HEADER_CRC_SPAN: usize = MAGIC_LENGTH + VERSION_LENGTH;

/// Partition record header size: magic, name, reserved, six words
pub const PART_HEADER_SIZE: usize = MAGIC_LENGTH + PART_NAME_LENGTH + PART_RESERVED_LENGTH + 24;

/// Partition CRC trailer size: crc, pad
pub const PART_CRC_SIZE: usize = 8;

/// Signature record size: magic, crc, pad
pub const SIGNATURE_SIZE: usize = MAGIC_LENGTH + 8;

/// Copy at most `N` bytes of `value` into a zero-filled field.
pub fn fixed_field<const N: usize>(value: &str) -> [u8; N] {
    let mut field = [0u8; N];
    let bytes = value.as_bytes();
    let len = bytes.len().min(N);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

/// Read a zero padded text field back, stopping at the first NUL.
pub fn field_to_string(field: &[u8]) -> String {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..len]).into_owned()
}

fn check_len(record: &'static str, data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        return Err(FwImageError::Truncated {
            record,
            offset: 0,
            needed,
            available: data.len(),
        });
    }
    Ok(())
}

fn read_magic(record: &'static str, cursor: &mut Cursor<&[u8]>, expected: &[u8]) -> Result<()> {
    let mut magic = [0u8; MAGIC_LENGTH];
    cursor.read_exact(&mut magic)?;
    if magic != expected {
        return Err(FwImageError::invalid_magic(record, expected, &magic));
    }
    Ok(())
}

/// Image header: `OPEN` magic, version string and header CRC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeader {
    /// Version text up to the first NUL, for display
    pub version: String,
    /// CRC32 over magic and version field
    pub crc: u32,
    /// Version field exactly as written and covered by `crc`
    field: [u8; VERSION_LENGTH],
}

impl ImageHeader {
    pub fn new(version: &str) -> Self {
        Self::from_field(fixed_field::<VERSION_LENGTH>(version))
    }

    fn from_field(field: [u8; VERSION_LENGTH]) -> Self {
        Self {
            version: field_to_string(&field),
            crc: Self::compute_crc(&field),
            field,
        }
    }

    /// Raw version field bytes.
    pub fn version_field(&self) -> &[u8; VERSION_LENGTH] {
        &self.field
    }

    fn compute_crc(version: &[u8; VERSION_LENGTH]) -> u32 {
        let mut span = Vec::with_capacity(HEADER_CRC_SPAN);
        span.extend_from_slice(MAGIC_HEADER);
        span.extend_from_slice(version);
        calculate_crc32(&span)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(HEADER_SIZE);
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(MAGIC_HEADER)?;
        writer.write_all(&self.field)?;
        writer.write_u32::<BigEndian>(self.crc)?;
        writer.write_u32::<BigEndian>(0)?;
        Ok(())
    }

    /// Parse a header and check its CRC.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        check_len("header", data, HEADER_SIZE)?;
        let mut cursor = Cursor::new(data);
        read_magic("header", &mut cursor, MAGIC_HEADER)?;

        let mut version = [0u8; VERSION_LENGTH];
        cursor.read_exact(&mut version)?;
        let crc = cursor.read_u32::<BigEndian>()?;
        let _pad = cursor.read_u32::<BigEndian>()?;

        let calculated = Self::compute_crc(&version);
        if crc != calculated {
            return Err(FwImageError::crc_mismatch("header", crc, calculated));
        }

        Ok(Self::from_field(version))
    }
}

/// Metadata block opening each partition record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionHeader {
    pub name: String,
    pub index: u32,
    /// Bytes of file content following this header
    pub data_size: u32,
    /// Allotted partition length
    pub part_size: u32,
    pub baseaddr: u32,
    pub memaddr: u32,
    pub entryaddr: u32,
}

impl PartitionHeader {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(PART_HEADER_SIZE);
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(MAGIC_PART)?;
        writer.write_all(&fixed_field::<PART_NAME_LENGTH>(&self.name))?;
        writer.write_all(&[0u8; PART_RESERVED_LENGTH])?;
        writer.write_u32::<BigEndian>(self.memaddr)?;
        writer.write_u32::<BigEndian>(self.index)?;
        writer.write_u32::<BigEndian>(self.baseaddr)?;
        writer.write_u32::<BigEndian>(self.entryaddr)?;
        writer.write_u32::<BigEndian>(self.data_size)?;
        writer.write_u32::<BigEndian>(self.part_size)?;
        Ok(())
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        check_len("partition", data, PART_HEADER_SIZE)?;
        let mut cursor = Cursor::new(data);
        read_magic("partition", &mut cursor, MAGIC_PART)?;

        let mut name = [0u8; PART_NAME_LENGTH];
        cursor.read_exact(&mut name)?;
        let mut reserved = [0u8; PART_RESERVED_LENGTH];
        cursor.read_exact(&mut reserved)?;

        let memaddr = cursor.read_u32::<BigEndian>()?;
        let index = cursor.read_u32::<BigEndian>()?;
        let baseaddr = cursor.read_u32::<BigEndian>()?;
        let entryaddr = cursor.read_u32::<BigEndian>()?;
        let data_size = cursor.read_u32::<BigEndian>()?;
        let part_size = cursor.read_u32::<BigEndian>()?;

        Ok(Self {
            name: field_to_string(&name),
            index,
            data_size,
            part_size,
            baseaddr,
            memaddr,
            entryaddr,
        })
    }
}

/// Trailer closing each partition record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionCrc {
    /// CRC32 over the partition header and its content
    pub crc: u32,
}

impl PartitionCrc {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(self.crc)?;
        writer.write_u32::<BigEndian>(0)?;
        Ok(())
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        check_len("partition crc", data, PART_CRC_SIZE)?;
        let mut cursor = Cursor::new(data);
        let crc = cursor.read_u32::<BigEndian>()?;
        Ok(Self { crc })
    }
}

/// Final record: `END.` magic and the CRC32 of everything before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub crc: u32,
}

impl Signature {
    /// Seal `preceding`, the complete image up to the signature.
    pub fn over(preceding: &[u8]) -> Self {
        Self {
            crc: calculate_crc32(preceding),
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(MAGIC_END)?;
        writer.write_u32::<BigEndian>(self.crc)?;
        writer.write_u32::<BigEndian>(0)?;
        Ok(())
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        check_len("signature", data, SIGNATURE_SIZE)?;
        let mut cursor = Cursor::new(data);
        read_magic("signature", &mut cursor, MAGIC_END)?;
        let crc = cursor.read_u32::<BigEndian>()?;
        Ok(Self { crc })
    }
}
