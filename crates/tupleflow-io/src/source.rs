//! Seekable-by-offset byte sources the block reader consumes.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A sequential byte source that can be opened at an arbitrary offset
/// (a local file, or e.g. an HTTP range-read adapter).
pub trait ByteSource: Send + Sync {
    /// Open a reader positioned `offset` bytes from the start.
    fn open_at(&self, offset: u64) -> io::Result<Box<dyn Read + Send>>;

    /// Total length of the underlying stream in bytes.
    fn len(&self) -> io::Result<u64>;
}

/// Local filesystem source.
#[derive(Debug, Clone)]
pub struct FsSource {
    path: PathBuf,
}

impl FsSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ByteSource for FsSource {
    fn open_at(&self, offset: u64) -> io::Result<Box<dyn Read + Send>> {
        let mut f = File::open(&self.path)?;
        f.seek(SeekFrom::Start(offset))?;
        Ok(Box::new(f))
    }

    fn len(&self) -> io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

/// In-memory source for tests (avoids file I/O).
#[derive(Clone)]
pub struct MemSource {
    data: Arc<Vec<u8>>,
}

impl MemSource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Arc::new(data.into()),
        }
    }
}

impl ByteSource for MemSource {
    fn open_at(&self, offset: u64) -> io::Result<Box<dyn Read + Send>> {
        let start = (offset as usize).min(self.data.len());
        Ok(Box::new(io::Cursor::new(self.data[start..].to_vec())))
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }
}
