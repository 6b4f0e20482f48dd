//! Progress reporting hooks

use std::path::Path;

use byte_unit::Byte;

use crate::board::BoardProfile;
use crate::layout::ImagePlan;

/// Observes an image build. Purely informational: nothing a reporter does
/// changes the outcome of the build.
pub trait Reporter {
    fn board_selected(&self, _profile: &BoardProfile) {}

    fn layout_planned(&self, _plan: &ImagePlan) {}

    fn image_validated(&self, _plan: &ImagePlan) {}

    fn image_written(&self, _path: &Path, _len: usize) {}
}

/// Reporter that stays silent
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Reporter forwarding to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn board_selected(&self, profile: &BoardProfile) {
        log::info!("board = {}", profile.name);
        log::debug!("{profile}");
    }

    fn layout_planned(&self, plan: &ImagePlan) {
        for part in plan.partitions() {
            log::debug!(
                "{}: {} bytes at 0x{:08x} (allotted {})",
                part.name,
                part.size,
                part.baseaddr,
                part.length
            );
        }
        log::debug!("allotted: {} bytes", plan.allotted_size());
    }

    fn image_validated(&self, plan: &ImagePlan) {
        log::info!("Firmware version: '{}'", plan.get_version());
        log::info!("Output file: '{}'", plan.get_output().display());
        log::info!("Part count: {}", plan.partitions().len());
        for part in plan.partitions() {
            log::info!(
                " {:>10}: {:>8} bytes (free: {:>8})",
                part.name,
                part.size,
                part.free()
            );
        }
        log::info!("{}", total_line(plan));
    }

    fn image_written(&self, path: &Path, len: usize) {
        log::info!(
            "image written to '{}': {:#}",
            path.display(),
            Byte::from_u64(len as u64)
        );
    }
}

/// Content total of a validated plan against its allotment.
fn total_line(plan: &ImagePlan) -> String {
    format!(
        "total: {:#} ({} bytes) of {} allotted",
        Byte::from_u64(plan.data_size()),
        plan.data_size(),
        plan.allotted_size()
    )
}
