//! Access to the input files

use std::io;
use std::path::Path;

/// Measures and reads the files backing each partition.
pub trait FileProbe {
    /// Byte length of the file at `path`.
    fn len(&self, path: &Path) -> io::Result<u64>;

    /// Full raw contents of the file at `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// [`FileProbe`] over the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl FileProbe for FsProbe {
    fn len(&self, path: &Path) -> io::Result<u64> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is not a regular file", path.display()),
            ));
        }
        Ok(meta.len())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}
