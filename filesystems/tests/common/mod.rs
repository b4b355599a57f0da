// Shared fixtures for the journal integration tests

#![allow(dead_code)]

use std::sync::Once;
use tempfile::NamedTempFile;
use vsfs_core::{BlockDevice, FileBlockDevice};
use vsfs_filesystems::constants::*;
use vsfs_filesystems::{DirectoryBlock, Inode, Superblock};

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// A formatted image in a temp file: valid superblock, no journal yet,
/// root directory (inode 0) owning the first data block with no entries
pub fn formatted_image() -> NamedTempFile {
    init_logging();

    let file = NamedTempFile::new().unwrap();
    file.as_file()
        .set_len(TOTAL_BLOCKS as u64 * BLOCK_SIZE as u64)
        .unwrap();

    let mut device = FileBlockDevice::open(file.path(), BLOCK_SIZE).unwrap();

    let mut block = vec![0u8; BLOCK_SIZE];
    block[..SUPERBLOCK_SIZE].copy_from_slice(&Superblock::default().encode());
    device.write_block(SUPERBLOCK_IDX, &block).unwrap();

    let mut bitmap = vec![0u8; BLOCK_SIZE];
    bitmap[0] = 1;
    device.write_block(INODE_BITMAP_IDX, &bitmap).unwrap();

    let mut table = vec![0u8; BLOCK_SIZE];
    let mut root = Inode {
        inode_type: INODE_TYPE_DIR,
        links: 1,
        ..Default::default()
    };
    root.direct[0] = DATA_START_IDX;
    root.write_into(&mut table, ROOT_INODE).unwrap();
    device.write_block(INODE_TABLE_IDX, &table).unwrap();
    device.sync().unwrap();

    file
}

/// Raw bytes of blocks `[start, end)`
pub fn read_blocks(image: &NamedTempFile, start: u32, end: u32) -> Vec<u8> {
    let mut device = FileBlockDevice::open(image.path(), BLOCK_SIZE).unwrap();
    (start..end)
        .flat_map(|b| device.read_block(b).unwrap())
        .collect()
}

/// Inode bitmap, inode table and root directory: everything `install` writes
pub fn metadata(image: &NamedTempFile) -> Vec<u8> {
    read_blocks(image, INODE_BITMAP_IDX, TOTAL_BLOCKS)
}

pub fn journal_bytes(image: &NamedTempFile) -> Vec<u8> {
    read_blocks(image, JOURNAL_START_IDX, INODE_BITMAP_IDX)
}

/// Names in the real root directory, in slot order
pub fn root_names(image: &NamedTempFile) -> Vec<String> {
    let mut device = FileBlockDevice::open(image.path(), BLOCK_SIZE).unwrap();
    let table = device.read_block(INODE_TABLE_IDX).unwrap();
    let root = Inode::read_from(&table, ROOT_INODE).unwrap();
    let dir = DirectoryBlock::decode(&device.read_block(root.direct[0]).unwrap()).unwrap();
    dir.occupied().map(|e| e.name_lossy()).collect()
}

pub fn read_inode(image: &NamedTempFile, index: u32) -> Inode {
    let table = read_blocks(image, INODE_TABLE_IDX, INODE_TABLE_IDX + 1);
    Inode::read_from(&table, index).unwrap()
}
