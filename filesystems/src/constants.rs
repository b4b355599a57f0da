// VSFS Filesystem Constants
// The image layout is fixed; every index below is an absolute block number

use static_assertions::{const_assert, const_assert_eq};

// Magic numbers
pub const VSFS_MAGIC: u32 = 0x5653_4653; // "VSFS"
pub const JOURNAL_MAGIC: u32 = 0x4A52_4E4C; // "JRNL"

// Block geometry
pub const BLOCK_SIZE: usize = 4096;
pub const SUPERBLOCK_IDX: u32 = 0;
pub const JOURNAL_START_IDX: u32 = 1;
pub const JOURNAL_BLOCKS: u32 = 16;
pub const INODE_BITMAP_IDX: u32 = JOURNAL_START_IDX + JOURNAL_BLOCKS;
pub const DATA_BITMAP_IDX: u32 = INODE_BITMAP_IDX + 1;
pub const INODE_TABLE_IDX: u32 = DATA_BITMAP_IDX + 1;
pub const INODE_BLOCKS: u32 = 2;
pub const DATA_START_IDX: u32 = INODE_TABLE_IDX + INODE_BLOCKS;
pub const DATA_BLOCKS: u32 = 64;
pub const TOTAL_BLOCKS: u32 = DATA_START_IDX + DATA_BLOCKS;

// Record sizes
pub const SUPERBLOCK_SIZE: usize = 128;
pub const INODE_SIZE: usize = 128;
pub const INODES_PER_BLOCK: u32 = (BLOCK_SIZE / INODE_SIZE) as u32;
pub const NUM_DIRECT_PTRS: usize = 8;
pub const NAME_LEN: usize = 28;
pub const DIR_ENTRY_SIZE: usize = 4 + NAME_LEN;
pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;

// Inode types
pub const INODE_TYPE_FILE: u16 = 1;
pub const INODE_TYPE_DIR: u16 = 2;

// Special inode numbers
pub const ROOT_INODE: u32 = 0;

// Journal records
pub const REC_DATA: u16 = 1;
pub const REC_COMMIT: u16 = 2;
pub const JOURNAL_HEADER_SIZE: usize = 8; // magic + nbytes_used
pub const RECORD_HEADER_SIZE: usize = 4; // type + size
pub const DATA_RECORD_SIZE: usize = RECORD_HEADER_SIZE + 4 + BLOCK_SIZE;
pub const COMMIT_RECORD_SIZE: usize = RECORD_HEADER_SIZE;
pub const JOURNAL_CAPACITY: usize = JOURNAL_BLOCKS as usize * BLOCK_SIZE;

/// Bytes one file-creation transaction occupies: three block images and a commit
pub const CREATE_TRANSACTION_SIZE: usize = 3 * DATA_RECORD_SIZE + COMMIT_RECORD_SIZE;

const_assert_eq!(TOTAL_BLOCKS, 85);
const_assert_eq!(DIR_ENTRY_SIZE, 32);
const_assert_eq!(DATA_RECORD_SIZE, 4104);
const_assert_eq!(CREATE_TRANSACTION_SIZE, 12316);
// The record size field is a u16
const_assert!(DATA_RECORD_SIZE <= u16::MAX as usize);
const_assert!(JOURNAL_CAPACITY <= u32::MAX as usize);
