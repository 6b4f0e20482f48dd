//! CRC32 as used by every record of the image (zlib `crc32()`)

use crc::{CRC_32_ISO_HDLC, Crc};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Calculate the IEEE CRC32 of `data`.
pub fn calculate_crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}
