// Block Device Implementation
// Fixed-size block access to the backing image, on disk or in memory

use crate::error::{Result, VsfsError};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Block-addressed storage. Every transfer moves exactly one block at
/// `block * block_size()`; a short transfer is an error, never retried.
pub trait BlockDevice {
    fn read_block(&mut self, block: u32) -> Result<Vec<u8>>;
    fn write_block(&mut self, block: u32, data: &[u8]) -> Result<()>;
    fn sync(&mut self) -> Result<()>;
    fn block_size(&self) -> usize;
    fn num_blocks(&self) -> u32;
}

/// Block device backed by a regular image file
pub struct FileBlockDevice {
    /// Path to the image
    path: PathBuf,
    /// Block size
    block_size: usize,
    /// Number of whole blocks in the file
    num_blocks: u32,
    /// File handle
    file: File,
}

impl FileBlockDevice {
    /// Open an existing image for reading and writing
    pub fn open(path: impl AsRef<Path>, block_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)?;

        let len = file.metadata()?.len();
        let num_blocks = u32::try_from(len / block_size as u64).unwrap_or(u32::MAX);
        log::debug!("Opened image {} ({} bytes, {} blocks)", path.display(), len, num_blocks);

        Ok(Self {
            path,
            block_size,
            num_blocks,
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlockDevice for FileBlockDevice {
    fn read_block(&mut self, block: u32) -> Result<Vec<u8>> {
        let offset = block as u64 * self.block_size as u64;
        self.file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; self.block_size];
        self.file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    fn write_block(&mut self, block: u32, data: &[u8]) -> Result<()> {
        if data.len() != self.block_size {
            return Err(VsfsError::InvalidBlockSize {
                expected: self.block_size,
                actual: data.len(),
            });
        }

        let offset = block as u64 * self.block_size as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;

        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> u32 {
        self.num_blocks
    }
}

/// In-memory block device, mostly for tests. Records every block written
/// so callers can check which blocks an operation touched.
#[derive(Clone)]
pub struct MemoryBlockDevice {
    data: Vec<u8>,
    block_size: usize,
    num_blocks: u32,
    write_log: Vec<u32>,
    syncs: usize,
}

impl MemoryBlockDevice {
    /// Zero-filled device of `num_blocks` blocks
    pub fn new(num_blocks: u32, block_size: usize) -> Self {
        Self {
            data: vec![0u8; num_blocks as usize * block_size],
            block_size,
            num_blocks,
            write_log: Vec::new(),
            syncs: 0,
        }
    }

    /// Raw bytes of the whole device
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Block indices written since creation (or the last `clear_write_log`)
    pub fn write_log(&self) -> &[u32] {
        &self.write_log
    }

    pub fn clear_write_log(&mut self) {
        self.write_log.clear();
    }

    pub fn sync_count(&self) -> usize {
        self.syncs
    }

    fn range(&self, block: u32) -> Result<std::ops::Range<usize>> {
        if block >= self.num_blocks {
            return Err(VsfsError::BlockOutOfRange {
                block,
                total: self.num_blocks,
            });
        }
        let start = block as usize * self.block_size;
        Ok(start..start + self.block_size)
    }
}

impl BlockDevice for MemoryBlockDevice {
    fn read_block(&mut self, block: u32) -> Result<Vec<u8>> {
        let range = self.range(block)?;
        Ok(self.data[range].to_vec())
    }

    fn write_block(&mut self, block: u32, data: &[u8]) -> Result<()> {
        if data.len() != self.block_size {
            return Err(VsfsError::InvalidBlockSize {
                expected: self.block_size,
                actual: data.len(),
            });
        }
        let range = self.range(block)?;
        self.data[range].copy_from_slice(data);
        self.write_log.push(block);
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.syncs += 1;
        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> u32 {
        self.num_blocks
    }
}
