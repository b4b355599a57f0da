// Test helpers for filesystem testing

use crate::constants::*;
use crate::directory::DirectoryBlock;
use crate::structures::{Inode, Superblock};
use vsfs_core::{BlockDevice, MemoryBlockDevice};

/// Lay a freshly formatted image onto `device`. The journal area stays
/// zeroed; root inode 0 owns the first data block, which holds no entries.
pub fn format_into<D: BlockDevice + ?Sized>(device: &mut D) {
    let mut superblock = vec![0u8; BLOCK_SIZE];
    superblock[..SUPERBLOCK_SIZE].copy_from_slice(&Superblock::default().encode());
    device.write_block(SUPERBLOCK_IDX, &superblock).unwrap();

    let mut bitmap = vec![0u8; BLOCK_SIZE];
    bitmap[0] = 0b0000_0001;
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
}

/// In-memory device holding a formatted image
pub fn formatted_device() -> MemoryBlockDevice {
    let mut device = MemoryBlockDevice::new(TOTAL_BLOCKS, BLOCK_SIZE);
    format_into(&mut device);
    device.clear_write_log();
    device
}

/// Inode as it currently sits in the real inode table
pub fn read_inode<D: BlockDevice + ?Sized>(device: &mut D, index: u32) -> Inode {
    let table = device.read_block(INODE_TABLE_IDX).unwrap();
    Inode::read_from(&table, index).unwrap()
}

/// Root directory as it currently sits on the device
pub fn read_dir<D: BlockDevice + ?Sized>(device: &mut D) -> DirectoryBlock {
    let root_block = read_inode(device, ROOT_INODE).direct[0];
    DirectoryBlock::decode(&device.read_block(root_block).unwrap()).unwrap()
}
