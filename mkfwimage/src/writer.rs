//! Drives plan, validation and serialization and persists the result

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::board::Board;
use crate::builder::serialize;
use crate::error::{FwImageError, Result};
use crate::layout::{CfgRequest, ImagePlan, plan};
use crate::probe::FileProbe;
use crate::report::Reporter;
use crate::validate::validate;
use crate::{DEFAULT_BOARD, DEFAULT_OUTPUT_FILE, DEFAULT_VERSION};

/// Inputs of one image build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub board: Board,
    pub kernel: PathBuf,
    pub rootfs: PathBuf,
    pub cfg: Option<CfgRequest>,
    pub version: String,
    pub output: PathBuf,
}

impl BuildRequest {
    pub fn new(board: Board, kernel: impl Into<PathBuf>, rootfs: impl Into<PathBuf>) -> Self {
        Self {
            board,
            kernel: kernel.into(),
            rootfs: rootfs.into(),
            cfg: None,
            version: DEFAULT_VERSION.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
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

    pub fn cfg(mut self, path: impl Into<PathBuf>, size: u32) -> Self {
        self.cfg = Some(CfgRequest::new(path, size));
        self
    }
}

impl Default for BuildRequest {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD, PathBuf::new(), PathBuf::new())
    }
}

/// Write `image` with a single `write` call.
///
/// A short write is a failure; it is not resumed.
pub fn write_image<W: Write>(writer: &mut W, image: &[u8]) -> Result<()> {
    let written = writer.write(image)?;
    if written != image.len() {
        return Err(FwImageError::WriteError {
            expected: image.len(),
            written,
        });
    }
    writer.flush()?;
    Ok(())
}

/// Runs a whole build against a file probe and a reporter
pub struct ImageWriter<'a, P: ?Sized, R: ?Sized> {
    probe: &'a P,
    reporter: &'a R,
}

impl<'a, P, R> ImageWriter<'a, P, R>
where
    P: FileProbe + ?Sized,
    R: Reporter + ?Sized,
{
    pub fn new(probe: &'a P, reporter: &'a R) -> Self {
        Self { probe, reporter }
    }

    /// Plan and validate `request` without producing any output.
    pub fn prepare(&self, request: &BuildRequest) -> Result<ImagePlan> {
        let profile = request.board.profile();
        self.reporter.board_selected(&profile);

        let mut plan = plan(
            &profile,
            &request.kernel,
            &request.rootfs,
            request.cfg.as_ref(),
            self.probe,
        )?
        .version(request.version.as_str())
        .output(request.output.as_path());
        self.reporter.layout_planned(&plan);

        validate(&mut plan, self.probe)?;
        self.reporter.image_validated(&plan);

        Ok(plan)
    }

    /// Plan, validate, serialize and write `request` to its output file.
    pub fn build(&self, request: &BuildRequest) -> Result<ImagePlan> {
        let plan = self.prepare(request)?;
        self.write(&plan, plan.get_output())?;
        Ok(plan)
    }

    /// Serialize a validated `plan` and write it to `destination`,
    /// replacing any existing content. Returns the image length.
    ///
    /// If the write fails once the file exists, the file is removed again.
    pub fn write(&self, plan: &ImagePlan, destination: &Path) -> Result<usize> {
        self.write_with(plan, destination, |path: &Path| File::create(path))
    }

    /// Like [`ImageWriter::write`], with `open` creating the sink for
    /// `destination`.
    pub fn write_with<W, F>(&self, plan: &ImagePlan, destination: &Path, open: F) -> Result<usize>
    where
        W: Write,
        F: FnOnce(&Path) -> io::Result<W>,
    {
        let image = serialize(plan, self.probe)?;

        let mut sink = open(destination).map_err(|source| FwImageError::CreateOutput {
            path: destination.to_path_buf(),
            source,
        })?;

        if let Err(e) = write_image(&mut sink, &image) {
            drop(sink);
            if let Err(rm) = std::fs::remove_file(destination) {
                log::warn!(
                    "could not remove partial image '{}': {rm}",
                    destination.display()
                );
            }
            return Err(e);
        }

        self.reporter.image_written(destination, image.len());
        Ok(image.len())
    }
}
