// VSFS On-Disk Structures
// Superblock, inode and directory entry records, encoded field by field in little-endian

use crate::constants::*;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::Cursor;
use vsfs_core::{Result, VsfsError};

/// Superblock - first 128 bytes of block 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub magic: u32,
    pub block_size: u32,
    pub total_blocks: u32,
    pub inode_count: u32,
    pub journal_block: u32,
    pub inode_bitmap: u32,
    pub data_bitmap: u32,
    pub inode_start: u32,
    pub data_start: u32,
}

impl Default for Superblock {
    /// Superblock describing the fixed image layout
    fn default() -> Self {
        Self {
            magic: VSFS_MAGIC,
            block_size: BLOCK_SIZE as u32,
            total_blocks: TOTAL_BLOCKS,
            inode_count: INODE_BLOCKS * INODES_PER_BLOCK,
            journal_block: JOURNAL_START_IDX,
            inode_bitmap: INODE_BITMAP_IDX,
            data_bitmap: DATA_BITMAP_IDX,
            inode_start: INODE_TABLE_IDX,
            data_start: DATA_START_IDX,
        }
    }
}

impl Superblock {
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < SUPERBLOCK_SIZE {
            return Err(VsfsError::InvalidSuperblock(format!(
                "need {} bytes, got {}",
                SUPERBLOCK_SIZE,
                data.len()
            )));
        }

        let mut cursor = Cursor::new(data);
        Ok(Self {
            magic: cursor.read_u32::<LittleEndian>()?,
            block_size: cursor.read_u32::<LittleEndian>()?,
            total_blocks: cursor.read_u32::<LittleEndian>()?,
            inode_count: cursor.read_u32::<LittleEndian>()?,
            journal_block: cursor.read_u32::<LittleEndian>()?,
            inode_bitmap: cursor.read_u32::<LittleEndian>()?,
            data_bitmap: cursor.read_u32::<LittleEndian>()?,
            inode_start: cursor.read_u32::<LittleEndian>()?,
            data_start: cursor.read_u32::<LittleEndian>()?,
        })
    }

    /// Encode into a 128-byte record, zero padded
    pub fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; SUPERBLOCK_SIZE];
        let fields = [
            self.magic,
            self.block_size,
            self.total_blocks,
            self.inode_count,
            self.journal_block,
            self.inode_bitmap,
            self.data_bitmap,
            self.inode_start,
            self.data_start,
        ];
        LittleEndian::write_u32_into(&fields, &mut data[..fields.len() * 4]);
        data
    }

    /// Check the superblock against the fixed layout this tool understands
    pub fn validate(&self) -> Result<()> {
        if self.magic != VSFS_MAGIC {
            return Err(VsfsError::InvalidSuperblock(format!(
                "bad magic {:#010x} (expected {:#010x})",
                self.magic, VSFS_MAGIC
            )));
        }
        if self.block_size as usize != BLOCK_SIZE {
            return Err(VsfsError::InvalidSuperblock(format!(
                "unsupported block size {}",
                self.block_size
            )));
        }

        let expected = Self::default();
        let layout = [
            ("total blocks", self.total_blocks, expected.total_blocks),
            ("journal block", self.journal_block, expected.journal_block),
            ("inode bitmap", self.inode_bitmap, expected.inode_bitmap),
            ("data bitmap", self.data_bitmap, expected.data_bitmap),
            ("inode table", self.inode_start, expected.inode_start),
            ("data start", self.data_start, expected.data_start),
        ];
        for (field, found, wanted) in layout {
            if found != wanted {
                return Err(VsfsError::InvalidSuperblock(format!(
                    "{} is {} (expected {})",
                    field, found, wanted
                )));
            }
        }

        if self.inode_count == 0 {
            return Err(VsfsError::InvalidSuperblock("inode count is zero".to_string()));
        }

        Ok(())
    }

    /// Inodes `create` may hand out. Only the first inode-table block is
    /// journaled, so allocation never reaches past it.
    pub fn allocatable_inodes(&self) -> u32 {
        self.inode_count.min(INODES_PER_BLOCK)
    }
}

/// Inode record (128 bytes on disk, 48 of them meaningful)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inode {
    pub inode_type: u16,
    pub links: u16,
    pub size: u32,
    pub direct: [u32; NUM_DIRECT_PTRS],
    pub ctime: u32,
    pub mtime: u32,
}

impl Inode {
    /// A fresh regular file: one link, empty, stamped with `now`
    pub fn new_file(now: u32) -> Self {
        Self {
            inode_type: INODE_TYPE_FILE,
            links: 1,
            size: 0,
            direct: [0; NUM_DIRECT_PTRS],
            ctime: now,
            mtime: now,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.inode_type == INODE_TYPE_DIR
    }

    fn slot(index: u32) -> Result<std::ops::Range<usize>> {
        if index >= INODES_PER_BLOCK {
            return Err(VsfsError::CorruptMetadata(format!(
                "inode {} is outside the first inode-table block",
                index
            )));
        }
        let start = index as usize * INODE_SIZE;
        Ok(start..start + INODE_SIZE)
    }

    /// Read inode `index` out of an inode-table block
    pub fn read_from(table: &[u8], index: u32) -> Result<Self> {
        let slot = Self::slot(index)?;
        let mut cursor = Cursor::new(&table[slot]);

        let inode_type = cursor.read_u16::<LittleEndian>()?;
        let links = cursor.read_u16::<LittleEndian>()?;
        let size = cursor.read_u32::<LittleEndian>()?;
        let mut direct = [0u32; NUM_DIRECT_PTRS];
        cursor.read_u32_into::<LittleEndian>(&mut direct)?;
        let ctime = cursor.read_u32::<LittleEndian>()?;
        let mtime = cursor.read_u32::<LittleEndian>()?;

        Ok(Self {
            inode_type,
            links,
            size,
            direct,
            ctime,
            mtime,
        })
    }

    /// Write the declared fields into slot `index`; padding bytes are left as they are
    pub fn write_into(&self, table: &mut [u8], index: u32) -> Result<()> {
        let slot = Self::slot(index)?;
        let record = &mut table[slot];

        LittleEndian::write_u16(&mut record[0..2], self.inode_type);
        LittleEndian::write_u16(&mut record[2..4], self.links);
        LittleEndian::write_u32(&mut record[4..8], self.size);
        LittleEndian::write_u32_into(&self.direct, &mut record[8..8 + NUM_DIRECT_PTRS * 4]);
        let times = 8 + NUM_DIRECT_PTRS * 4;
        LittleEndian::write_u32(&mut record[times..times + 4], self.ctime);
        LittleEndian::write_u32(&mut record[times + 4..times + 8], self.mtime);

        Ok(())
    }

    /// Zero the whole 128-byte slot, padding included
    pub fn clear_slot(table: &mut [u8], index: u32) -> Result<()> {
        let slot = Self::slot(index)?;
        table[slot].fill(0);
        Ok(())
    }
}

/// Directory entry: inode number plus a NUL-terminated name buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub inode: u32,
    pub name: [u8; NAME_LEN],
}

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            inode: 0,
            name: [0; NAME_LEN],
        }
    }
}

impl DirEntry {
    /// Build an entry; `name` must already be validated
    pub fn new(inode: u32, name: &str) -> Self {
        let mut buf = [0u8; NAME_LEN];
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_LEN - 1);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self { inode, name: buf }
    }

    /// Free iff both the inode number and the first name byte are zero
    pub fn is_free(&self) -> bool {
        self.inode == 0 && self.name[0] == 0
    }

    /// Name bytes up to the terminator
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        &self.name[..end]
    }

    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let inode = cursor.read_u32::<LittleEndian>()?;
        let mut name = [0u8; NAME_LEN];
        std::io::Read::read_exact(&mut cursor, &mut name)?;
        Ok(Self { inode, name })
    }

    pub fn encode_into(&self, data: &mut [u8]) {
        LittleEndian::write_u32(&mut data[0..4], self.inode);
        data[4..DIR_ENTRY_SIZE].copy_from_slice(&self.name);
    }
}
