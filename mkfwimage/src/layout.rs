//! Partition layout planning
//!
//! The kernel sits at the board's kernel start address and is allotted
//! exactly its own size. The rootfs follows it and receives everything left
//! of the board budget, minus the cfg partition when one is requested. The
//! cfg partition closes the layout.

use std::path::{Path, PathBuf};

use crate::board::BoardProfile;
use crate::error::{FwImageError, Result};
use crate::probe::FileProbe;
use crate::{DEFAULT_OUTPUT_FILE, DEFAULT_VERSION};

/// One logical partition of the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDescriptor {
    pub name: String,
    /// 1-based position in the image
    pub index: u32,
    pub baseaddr: u32,
    pub memaddr: u32,
    pub entryaddr: u32,
    /// Allotted length
    pub length: u32,
    /// File backing the partition
    pub path: PathBuf,
    /// Measured file length, refreshed by validation
    pub size: u64,
}

impl PartitionDescriptor {
    /// Allotted bytes the content does not use.
    pub fn free(&self) -> u64 {
        u64::from(self.length).saturating_sub(self.size)
    }

    /// First address past the allotment.
    pub fn end(&self) -> u64 {
        u64::from(self.baseaddr) + u64::from(self.length)
    }
}

/// Request for the optional cfg partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgRequest {
    pub path: PathBuf,
    /// Allotted size in bytes; zero disables the partition
    pub size: u32,
}

impl CfgRequest {
    pub fn new(path: impl Into<PathBuf>, size: u32) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// Ordered partitions plus the image version and destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlan {
    version: String,
    output: PathBuf,
    partitions: Vec<PartitionDescriptor>,
}

impl ImagePlan {
    /// An empty plan with the default version and output file.
    pub fn new() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            partitions: Vec::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Append a partition as given; the validator checks it later.
    pub fn push(&mut self, partition: PartitionDescriptor) {
        self.partitions.push(partition);
    }

    pub fn get_version(&self) -> &str {
        &self.version
    }

    pub fn get_output(&self) -> &Path {
        &self.output
    }

    pub fn partitions(&self) -> &[PartitionDescriptor] {
        &self.partitions
    }

    pub fn partitions_mut(&mut self) -> &mut [PartitionDescriptor] {
        &mut self.partitions
    }

    pub fn partition(&self, name: &str) -> Option<&PartitionDescriptor> {
        self.partitions.iter().find(|p| p.name == name)
    }

    /// Sum of measured content sizes.
    pub fn data_size(&self) -> u64 {
        self.partitions.iter().map(|p| p.size).sum()
    }

    /// Sum of allotted lengths.
    pub fn allotted_size(&self) -> u64 {
        self.partitions.iter().map(|p| u64::from(p.length)).sum()
    }
}

impl Default for ImagePlan {
    fn default() -> Self {
        Self::new()
    }
}

fn measure<P: FileProbe + ?Sized>(probe: &P, partition: &str, path: &Path) -> Result<u64> {
    probe.len(path).map_err(|source| FwImageError::FileNotFound {
        partition: partition.to_string(),
        path: path.to_path_buf(),
        source,
    })
}

fn offset(base: u32, by: u32, partition: &str) -> Result<u32> {
    base.checked_add(by)
        .ok_or_else(|| FwImageError::AddressOverflow {
            partition: partition.to_string(),
        })
}

/// Lay out kernel, rootfs and the optional cfg partition for `profile`.
///
/// Kernel and rootfs are measured through `probe`. The cfg partition is
/// only added for a non-zero size; its file is measured by validation.
pub fn plan<P: FileProbe + ?Sized>(
    profile: &BoardProfile,
    kernel: &Path,
    rootfs: &Path,
    cfg: Option<&CfgRequest>,
    probe: &P,
) -> Result<ImagePlan> {
    let kernel_size = measure(probe, "kernel", kernel)?;
    let rootfs_size = measure(probe, "rootfs", rootfs)?;

    let max = profile.max_length;
    if kernel_size.saturating_add(rootfs_size) > u64::from(max) {
        return Err(FwImageError::KernelTooLarge {
            kernel: kernel_size,
            rootfs: rootfs_size,
            max,
        });
    }
    // Both fit in `max`, so neither truncates.
    let kernel_length = kernel_size as u32;

    let mut plan = ImagePlan::new();
    plan.push(PartitionDescriptor {
        name: "kernel".to_string(),
        index: 1,
        baseaddr: profile.kernel_start,
        memaddr: profile.kernel_entry,
        entryaddr: profile.kernel_entry,
        length: kernel_length,
        path: kernel.to_path_buf(),
        size: kernel_size,
    });

    let rootfs_base = offset(profile.kernel_start, kernel_length, "rootfs")?;
    let mut rootfs_length = max - kernel_length;

    let cfg = cfg.filter(|c| c.size > 0);
    let cfg_partition = match cfg {
        Some(cfg) => {
            if cfg.size > rootfs_length {
                return Err(FwImageError::CfgTooLarge {
                    cfg: cfg.size,
                    available: rootfs_length,
                });
            }
            rootfs_length -= cfg.size;

            Some(PartitionDescriptor {
                name: "cfg".to_string(),
                index: 3,
                baseaddr: offset(rootfs_base, rootfs_length, "cfg")?,
                memaddr: 0,
                entryaddr: 0,
                length: cfg.size,
                path: cfg.path.clone(),
                size: 0,
            })
        }
        None => None,
    };

    plan.push(PartitionDescriptor {
        name: "rootfs".to_string(),
        index: 2,
        baseaddr: rootfs_base,
        memaddr: 0,
        entryaddr: 0,
        length: rootfs_length,
        path: rootfs.to_path_buf(),
        size: rootfs_size,
    });

    if let Some(cfg) = cfg_partition {
        plan.push(cfg);
    }

    Ok(plan)
}
