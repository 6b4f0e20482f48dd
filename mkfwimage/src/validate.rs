//! Checks a plan against the files that back it

use crate::MAX_PARTITIONS;
use crate::error::{FwImageError, Result};
use crate::image_header::PART_NAME_LENGTH;
use crate::layout::ImagePlan;
use crate::probe::FileProbe;

/// Check every partition of `plan`, stopping at the first failure.
///
/// Each partition's measured size is refreshed from `probe` as it is
/// checked, so a validated plan describes the files as they are now.
pub fn validate<P: FileProbe + ?Sized>(plan: &mut ImagePlan, probe: &P) -> Result<()> {
    let count = plan.partitions().len();
    if count == 0 || count > MAX_PARTITIONS {
        return Err(FwImageError::InvalidPartitionCount { count });
    }

    for part in plan.partitions_mut() {
        let name_len = part.name.len();
        if name_len == 0 || name_len > PART_NAME_LENGTH {
            return Err(FwImageError::InvalidPartitionName {
                index: part.index,
                name: part.name.clone(),
            });
        }

        part.size = probe
            .len(&part.path)
            .map_err(|source| FwImageError::FileNotFound {
                partition: part.name.clone(),
                path: part.path.clone(),
                source,
            })?;

        if part.size == 0 {
            return Err(FwImageError::EmptyFile {
                partition: part.name.clone(),
                path: part.path.clone(),
            });
        }

        let max = u64::from(part.length);
        if part.size > max {
            return Err(FwImageError::FileTooLarge {
                partition: part.name.clone(),
                path: part.path.clone(),
                size: part.size,
                max: part.length,
                excess: part.size - max,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::layout::{CfgRequest, PartitionDescriptor, plan};
    use crate::probe::mem::MemProbe;
    use std::path::{Path, PathBuf};

    fn part(name: &str, index: u32, path: &str, length: u32) -> PartitionDescriptor {
        PartitionDescriptor {
            name: name.to_string(),
            index,
            baseaddr: 0,
            memaddr: 0,
            entryaddr: 0,
            length,
            path: PathBuf::from(path),
            size: 0,
        }
    }

    #[test]
    fn test_validate_ok_refreshes_sizes() {
        let files = MemProbe::new()
            .with("vmlinux", vec![1; 100])
            .with("rootfs", vec![2; 200])
            .with("cfg.bin", vec![3; 300]);
        let cfg = CfgRequest::new("cfg.bin", 0x1000);
        let mut plan = plan(
            &Board::Xs2.profile(),
            Path::new("vmlinux"),
            Path::new("rootfs"),
            Some(&cfg),
            &files,
        )
        .unwrap();
        assert_eq!(plan.partition("cfg").unwrap().size, 0);

        validate(&mut plan, &files).unwrap();
        assert_eq!(plan.partition("cfg").unwrap().size, 300);
        assert_eq!(plan.data_size(), 600);
    }

    #[test]
    fn test_validate_empty_plan() {
        let mut plan = ImagePlan::new();
        let err = validate(&mut plan, &MemProbe::new()).unwrap_err();
        assert!(matches!(err, FwImageError::InvalidPartitionCount { count: 0 }));
    }

    #[test]
    fn test_validate_too_many_partitions() {
        let mut files = MemProbe::new();
        let mut plan = ImagePlan::new();
        for i in 0..=MAX_PARTITIONS {
            let path = format!("part{i}");
            files = files.with(&path, vec![0; 4]);
            plan.push(part(&format!("p{i}"), i as u32 + 1, &path, 16));
        }
        let err = validate(&mut plan, &files).unwrap_err();
        assert!(matches!(err, FwImageError::InvalidPartitionCount { count: 9 }));
    }

    #[test]
    fn test_validate_name_too_long_stops_before_later_files() {
        // The second partition's file does not exist; the bad name on the
        // first one must be reported instead.
        let files = MemProbe::new().with("a", vec![1; 4]);
        let mut plan = ImagePlan::new();
        plan.push(part("a-very-long-partition", 1, "a", 16));
        plan.push(part("rootfs", 2, "missing", 16));

        let err = validate(&mut plan, &files).unwrap_err();
        assert!(matches!(err, FwImageError::InvalidPartitionName { index: 1, .. }));
        assert_eq!(plan.partitions()[0].size, 0);
    }

    #[test]
    fn test_validate_name_limits() {
        let files = MemProbe::new().with("a", vec![1; 4]);

        let mut empty_name = ImagePlan::new();
        empty_name.push(part("", 1, "a", 16));
        assert!(matches!(
            validate(&mut empty_name, &files).unwrap_err(),
            FwImageError::InvalidPartitionName { .. }
        ));

        let mut sixteen = ImagePlan::new();
        sixteen.push(part(&"n".repeat(16), 1, "a", 16));
        validate(&mut sixteen, &files).unwrap();
    }

    #[test]
    fn test_validate_missing_file() {
        let mut plan = ImagePlan::new();
        plan.push(part("kernel", 1, "vmlinux", 16));
        let err = validate(&mut plan, &MemProbe::new()).unwrap_err();
        assert!(matches!(err, FwImageError::FileNotFound { .. }));
    }

    #[test]
    fn test_validate_empty_rootfs() {
        let files = MemProbe::new()
            .with("vmlinux", vec![1; 64])
            .with("rootfs", Vec::new());
        let mut plan = plan(
            &Board::Xs2.profile(),
            Path::new("vmlinux"),
            Path::new("rootfs"),
            None,
            &files,
        )
        .unwrap();

        let err = validate(&mut plan, &files).unwrap_err();
        assert!(matches!(err, FwImageError::EmptyFile { ref partition, .. } if partition == "rootfs"));
    }

    #[test]
    fn test_validate_rootfs_too_large_for_shrunk_allotment() {
        let profile = Board::Xs5.profile();
        let files = MemProbe::new()
            .with("vmlinux", vec![1; 0x0010_0000])
            .with("rootfs", vec![2; 0x0028_0000])
            .with("cfg.bin", vec![3; 0x100]);
        let cfg = CfgRequest::new("cfg.bin", 0x0002_0000);
        let mut plan = plan(
            &profile,
            Path::new("vmlinux"),
            Path::new("rootfs"),
            Some(&cfg),
            &files,
        )
        .unwrap();

        let err = validate(&mut plan, &files).unwrap_err();
        match err {
            FwImageError::FileTooLarge {
                partition,
                size,
                max,
                excess,
                ..
            } => {
                assert_eq!(partition, "rootfs");
                assert_eq!(size, 0x0028_0000);
                assert_eq!(max, 0x0027_0000);
                assert_eq!(excess, 0x0001_0000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
