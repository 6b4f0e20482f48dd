//! Rendering a validated plan into the image byte stream, and parsing an
//! image back into its records

use std::fmt::Write as _;
use std::io;

use crate::crc::calculate_crc32;
use crate::error::{FwImageError, Result};
use crate::image_header::{
    HEADER_SIZE, ImageHeader, PART_CRC_SIZE, PART_HEADER_SIZE, PartitionCrc, PartitionHeader,
    SIGNATURE_SIZE, Signature,
};
use crate::layout::{ImagePlan, PartitionDescriptor};
use crate::probe::FileProbe;
use crate::{MAGIC_LENGTH, MAGIC_PART};

/// Exact byte length of the image `plan` serializes to.
pub fn image_size(plan: &ImagePlan) -> usize {
    HEADER_SIZE
        + plan
            .partitions()
            .iter()
            .map(|p| PART_HEADER_SIZE + p.size as usize + PART_CRC_SIZE)
            .sum::<usize>()
        + SIGNATURE_SIZE
}

fn part_error(part: &PartitionDescriptor, source: io::Error) -> FwImageError {
    FwImageError::PartWriteError {
        index: part.index,
        name: part.name.clone(),
        path: part.path.clone(),
        source,
    }
}

fn write_part<P: FileProbe + ?Sized>(
    image: &mut Vec<u8>,
    part: &PartitionDescriptor,
    probe: &P,
) -> Result<()> {
    let content = probe.read(&part.path).map_err(|e| part_error(part, e))?;
    if content.len() as u64 != part.size {
        return Err(part_error(
            part,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "file is {} bytes, {} were validated",
                    content.len(),
                    part.size
                ),
            ),
        ));
    }
    let data_size = u32::try_from(content.len()).map_err(|_| {
        part_error(
            part,
            io::Error::new(io::ErrorKind::InvalidData, "file exceeds 4 GiB"),
        )
    })?;

    let start = image.len();
    PartitionHeader {
        name: part.name.clone(),
        index: part.index,
        data_size,
        part_size: part.length,
        baseaddr: part.baseaddr,
        memaddr: part.memaddr,
        entryaddr: part.entryaddr,
    }
    .write_to(image)?;
    image.extend_from_slice(&content);

    let crc = calculate_crc32(&image[start..]);
    PartitionCrc { crc }.write_to(image)?;
    Ok(())
}

/// Render a validated `plan` into the complete image.
///
/// Partition contents are read through `probe` one at a time. Nothing is
/// returned unless every partition was rendered, so a failed build leaves
/// no partial image behind.
pub fn serialize<P: FileProbe + ?Sized>(plan: &ImagePlan, probe: &P) -> Result<Vec<u8>> {
    let size = image_size(plan);
    let mut image = Vec::with_capacity(size);

    ImageHeader::new(plan.get_version()).write_to(&mut image)?;

    for part in plan.partitions() {
        write_part(&mut image, part, probe)?;
        log::debug!(
            "part {} '{}': {} bytes at 0x{:08x}",
            part.index,
            part.name,
            part.size,
            part.baseaddr
        );
    }

    Signature::over(&image).write_to(&mut image)?;
    debug_assert_eq!(image.len(), size);

    Ok(image)
}

/// A partition record read back from an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPartition {
    pub header: PartitionHeader,
    pub data: Vec<u8>,
    /// Stored CRC, already checked against header and data
    pub crc: u32,
}

/// An image parsed back into its records, with every CRC checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    pub header: ImageHeader,
    pub partitions: Vec<ParsedPartition>,
    pub signature: Signature,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, record: &'static str, len: usize) -> Result<&'a [u8]> {
        let available = self.data.len() - self.pos;
        if available < len {
            return Err(FwImageError::Truncated {
                record,
                offset: self.pos,
                needed: len,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn peek_magic(&self) -> Option<&'a [u8]> {
        self.data.get(self.pos..self.pos + MAGIC_LENGTH)
    }
}

impl FirmwareImage {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = Reader { data, pos: 0 };

        let header = ImageHeader::from_bytes(reader.take("header", HEADER_SIZE)?)?;

        let mut partitions = Vec::new();
        while reader.peek_magic() == Some(MAGIC_PART.as_slice()) {
            let start = reader.pos;
            let part = PartitionHeader::from_bytes(reader.take("partition", PART_HEADER_SIZE)?)?;
            let content = reader.take("partition data", part.data_size as usize)?;
            let covered = &data[start..reader.pos];
            let stored = PartitionCrc::from_bytes(reader.take("partition crc", PART_CRC_SIZE)?)?;

            let calculated = calculate_crc32(covered);
            if stored.crc != calculated {
                return Err(FwImageError::crc_mismatch(
                    format!("partition '{}'", part.name),
                    stored.crc,
                    calculated,
                ));
            }

            partitions.push(ParsedPartition {
                header: part,
                data: content.to_vec(),
                crc: stored.crc,
            });
        }

        let sealed = reader.pos;
        let signature = Signature::from_bytes(reader.take("signature", SIGNATURE_SIZE)?)?;
        let calculated = calculate_crc32(&data[..sealed]);
        if signature.crc != calculated {
            return Err(FwImageError::crc_mismatch(
                "signature",
                signature.crc,
                calculated,
            ));
        }

        let trailing = data.len() - reader.pos;
        if trailing != 0 {
            return Err(FwImageError::TrailingData { len: trailing });
        }

        Ok(Self {
            header,
            partitions,
            signature,
        })
    }

    pub fn partition(&self, name: &str) -> Option<&ParsedPartition> {
        self.partitions.iter().find(|p| p.header.name == name)
    }

    /// Serialized length of this image.
    pub fn total_size(&self) -> usize {
        HEADER_SIZE
            + self
                .partitions
                .iter()
                .map(|p| PART_HEADER_SIZE + p.data.len() + PART_CRC_SIZE)
                .sum::<usize>()
            + SIGNATURE_SIZE
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "Firmware version: '{}'\nHeader CRC32: 0x{:08x}\nPart count: {}\n",
            self.header.version,
            self.header.crc,
            self.partitions.len()
        );
        for p in &self.partitions {
            let h = &p.header;
            let _ = writeln!(
                out,
                " {:>2} {:>10}: {:>8} bytes (part 0x{:08x}) base 0x{:08x} mem 0x{:08x} entry 0x{:08x} crc 0x{:08x}",
                h.index, h.name, h.data_size, h.part_size, h.baseaddr, h.memaddr, h.entryaddr, p.crc
            );
        }
        let _ = write!(out, "Signature CRC32: 0x{:08x}", self.signature.crc);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::layout::{CfgRequest, plan};
    use crate::probe::mem::MemProbe;
    use crate::validate::validate;
    use std::path::Path;

    fn fixture() -> (ImagePlan, MemProbe) {
        let files = MemProbe::new()
            .with("vmlinux", b"kernel-image-bytes".to_vec())
            .with("rootfs", vec![0xa5; 333])
            .with("cfg.bin", b"cfg".to_vec());
        let cfg = CfgRequest::new("cfg.bin", 0x0001_0000);
        let mut plan = plan(
            &Board::Xm.profile(),
            Path::new("vmlinux"),
            Path::new("rootfs"),
            Some(&cfg),
            &files,
        )
        .unwrap()
        .version("XM.v5.5");
        validate(&mut plan, &files).unwrap();
        (plan, files)
    }

    #[test]
    fn test_serialize_size_and_framing() {
        let (plan, files) = fixture();
        let image = serialize(&plan, &files).unwrap();

        assert_eq!(image.len(), image_size(&plan));
        assert_eq!(image.len(), 268 + (56 + 18 + 8) + (56 + 333 + 8) + (56 + 3 + 8) + 12);
        assert_eq!(&image[..4], b"OPEN");
        assert_eq!(&image[268..272], b"PART");
        assert_eq!(&image[image.len() - 12..image.len() - 8], b"END.");
        assert_eq!(&image[image.len() - 4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_parse_recovers_fields() {
        let (plan, files) = fixture();
        let image = serialize(&plan, &files).unwrap();
        let parsed = FirmwareImage::from_bytes(&image).unwrap();

        assert_eq!(parsed.header.version, "XM.v5.5");
        assert_eq!(parsed.partitions.len(), 3);
        assert_eq!(parsed.total_size(), image.len());

        for (desc, part) in plan.partitions().iter().zip(&parsed.partitions) {
            assert_eq!(part.header.name, desc.name);
            assert_eq!(part.header.index, desc.index);
            assert_eq!(u64::from(part.header.data_size), desc.size);
            assert_eq!(part.header.part_size, desc.length);
            assert_eq!(part.header.baseaddr, desc.baseaddr);
            assert_eq!(part.header.memaddr, desc.memaddr);
            assert_eq!(part.header.entryaddr, desc.entryaddr);
            assert_eq!(part.data, files.read(&desc.path).unwrap());
        }
        assert_eq!(parsed.partition("kernel").unwrap().header.entryaddr, 0x8000_2000);
    }

    #[test]
    fn test_multibyte_version_at_field_end_verifies() {
        let (plan, files) = fixture();
        let plan = plan.version(format!("{}é", "v".repeat(255)));
        let image = serialize(&plan, &files).unwrap();

        let stored = u32::from_be_bytes(image[260..264].try_into().unwrap());
        assert_eq!(stored, calculate_crc32(&image[..260]));
        let parsed = FirmwareImage::from_bytes(&image).unwrap();
        assert_eq!(parsed.header.version_field()[255], 0xc3);
    }

    #[test]
    fn test_signature_covers_everything_before_it() {
        let (plan, files) = fixture();
        let image = serialize(&plan, &files).unwrap();
        let body = &image[..image.len() - SIGNATURE_SIZE];
        let stored = u32::from_be_bytes(image[image.len() - 8..image.len() - 4].try_into().unwrap());
        assert_eq!(stored, calculate_crc32(body));
    }

    #[test]
    fn test_any_flipped_byte_is_detected() {
        let (plan, files) = fixture();
        let image = serialize(&plan, &files).unwrap();
        let sealed = image.len() - SIGNATURE_SIZE;
        let stored = calculate_crc32(&image[..sealed]);

        for pos in (0..sealed).step_by(7) {
            let mut tampered = image.clone();
            tampered[pos] ^= 0x40;
            assert_ne!(calculate_crc32(&tampered[..sealed]), stored, "offset {pos}");
            assert!(FirmwareImage::from_bytes(&tampered).is_err(), "offset {pos}");
        }
    }

    #[test]
    fn test_partition_crc_covers_header_and_data() {
        let (plan, files) = fixture();
        let image = serialize(&plan, &files).unwrap();
        let start = HEADER_SIZE;
        let end = start + PART_HEADER_SIZE + 18;
        let stored = u32::from_be_bytes(image[end..end + 4].try_into().unwrap());
        assert_eq!(stored, calculate_crc32(&image[start..end]));
    }

    #[test]
    fn test_serialize_unreadable_part() {
        let (plan, _) = fixture();
        let partial = MemProbe::new()
            .with("vmlinux", b"kernel-image-bytes".to_vec())
            .with("rootfs", vec![0xa5; 333]);
        let err = serialize(&plan, &partial).unwrap_err();
        assert!(matches!(
            err,
            FwImageError::PartWriteError { index: 3, ref name, .. } if name == "cfg"
        ));
    }

    #[test]
    fn test_serialize_file_changed_after_validation() {
        let (plan, _) = fixture();
        let grown = MemProbe::new()
            .with("vmlinux", b"kernel-image-bytes-and-more".to_vec())
            .with("rootfs", vec![0xa5; 333])
            .with("cfg.bin", b"cfg".to_vec());
        let err = serialize(&plan, &grown).unwrap_err();
        assert!(matches!(err, FwImageError::PartWriteError { index: 1, .. }));
    }

    #[test]
    fn test_parse_rejects_trailing_and_truncated() {
        let (plan, files) = fixture();
        let mut image = serialize(&plan, &files).unwrap();

        let truncated = &image[..image.len() - 1];
        assert!(matches!(
            FirmwareImage::from_bytes(truncated).unwrap_err(),
            FwImageError::Truncated { record: "signature", .. }
        ));

        image.push(0);
        assert!(matches!(
            FirmwareImage::from_bytes(&image).unwrap_err(),
            FwImageError::TrailingData { len: 1 }
        ));
    }

    #[test]
    fn test_summary_lists_partitions() {
        let (plan, files) = fixture();
        let parsed = FirmwareImage::from_bytes(&serialize(&plan, &files).unwrap()).unwrap();
        let summary = parsed.summary();
        assert!(summary.contains("XM.v5.5"));
        assert!(summary.contains("kernel"));
        assert!(summary.contains("rootfs"));
        assert!(summary.contains("cfg"));
        assert!(summary.contains("0x9f050000"));
    }
}
