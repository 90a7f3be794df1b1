use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use memmap2::{Mmap, MmapOptions};

use crate::error::SourceError;

/// Byte-addressed access to the container that backs a set of bitmaps.
pub trait AssetReader: Send + Sync {
    fn set_position(&self, offset: u64);

    fn position(&self) -> u64;

    /// Copy `len` bytes from the current position and advance past them.
    fn read_bytes(&self, len: usize) -> Result<Vec<u8>, SourceError>;

    /// Borrow everything from `offset` to the end of the store.
    fn view_from(&self, offset: u64) -> Result<&[u8], SourceError>;
}

/// Cursor over any contiguous byte store.
#[derive(Debug)]
pub struct ByteReader<B> {
    bytes: B,
    position: AtomicU64,
}

pub type MemoryReader = ByteReader<Vec<u8>>;

impl<B: AsRef<[u8]>> ByteReader<B> {
    pub fn new(bytes: B) -> Self {
        Self {
            bytes,
            position: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tail(&self, offset: u64) -> Result<&[u8], SourceError> {
        let bytes = self.bytes.as_ref();
        usize::try_from(offset)
            .ok()
            .and_then(|start| bytes.get(start..))
            .ok_or(SourceError::OffsetOutOfRange {
                offset,
                len: bytes.len() as u64,
            })
    }
}

impl<B: AsRef<[u8]> + Send + Sync> AssetReader for ByteReader<B> {
    fn set_position(&self, offset: u64) {
        self.position.store(offset, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn read_bytes(&self, len: usize) -> Result<Vec<u8>, SourceError> {
        let offset = self.position();
        let tail = self.tail(offset)?;
        let chunk = tail.get(..len).ok_or(SourceError::ReadOutOfRange {
            offset,
            requested: len,
            available: tail.len(),
        })?;
        self.position.store(offset + len as u64, Ordering::Relaxed);
        Ok(chunk.to_vec())
    }

    fn view_from(&self, offset: u64) -> Result<&[u8], SourceError> {
        self.tail(offset)
    }
}

/// Container file mapped into memory.
#[derive(Debug)]
pub struct MappedArchive {
    path: PathBuf,
    reader: ByteReader<Mmap>,
}

impl MappedArchive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = File::open(&path_buf)
            .with_context(|| format!("opening container at {}", path_buf.display()))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("memory-mapping container {}", path_buf.display()))?;

        Ok(MappedArchive {
            path: path_buf,
            reader: ByteReader::new(mmap),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.reader.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reader.is_empty()
    }
}

impl AssetReader for MappedArchive {
    fn set_position(&self, offset: u64) {
        self.reader.set_position(offset);
    }

    fn position(&self) -> u64 {
        self.reader.position()
    }

    fn read_bytes(&self, len: usize) -> Result<Vec<u8>, SourceError> {
        self.reader.read_bytes(len)
    }

    fn view_from(&self, offset: u64) -> Result<&[u8], SourceError> {
        self.reader.view_from(offset)
    }
}
