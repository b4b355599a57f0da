// File Creation Transactions
// Stages the next metadata state in memory and logs it; only install touches real metadata

use crate::bitmap::Bitmap;
use crate::constants::*;
use crate::directory::{validate_name, DirectoryBlock};
use crate::journal::{DataRecord, JournalArea, Transaction, WalkOutcome};
use crate::structures::{DirEntry, Inode, Superblock};
use serde::Serialize;
use vsfs_core::{BlockDevice, Result, VsfsError};

/// Outcome of a logged creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateReport {
    pub name: String,
    /// Inode allocated to the file
    pub inode: u32,
    /// Root directory slot holding the entry
    pub slot: usize,
    /// Journal bytes used after the append
    pub journal_bytes_used: usize,
    /// Committed transactions now waiting for install
    pub pending_transactions: usize,
    /// Allocatable inodes still free once this creation is installed
    pub free_inodes: u32,
}

/// The three metadata blocks a creation rewrites, as seen by this operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSnapshot {
    pub inode_bitmap: Vec<u8>,
    pub inode_table: Vec<u8>,
    pub root_dir: Vec<u8>,
    /// Absolute block holding the root directory's entries
    pub root_dir_block: u32,
}

impl MetadataSnapshot {
    /// Read the on-disk metadata blocks
    pub fn load<D: BlockDevice + ?Sized>(device: &mut D) -> Result<Self> {
        let inode_bitmap = device.read_block(INODE_BITMAP_IDX)?;
        let inode_table = device.read_block(INODE_TABLE_IDX)?;

        let root = Inode::read_from(&inode_table, ROOT_INODE)?;
        if !root.is_directory() {
            return Err(VsfsError::CorruptMetadata(format!(
                "root inode has type {}, not a directory",
                root.inode_type
            )));
        }
        let root_dir_block = root.direct[0];
        if !(DATA_START_IDX..TOTAL_BLOCKS).contains(&root_dir_block) {
            return Err(VsfsError::CorruptMetadata(format!(
                "root directory block {} lies outside the data region",
                root_dir_block
            )));
        }
        let root_dir = device.read_block(root_dir_block)?;

        Ok(Self {
            inode_bitmap,
            inode_table,
            root_dir,
            root_dir_block,
        })
    }

    /// Overlay logged block images onto the snapshot, in log order.
    /// Only the three blocks a creation rewrites are tracked; returns how
    /// many records were applied.
    pub fn fold(&mut self, transactions: &[Transaction]) -> usize {
        let mut applied = 0;
        for record in transactions.iter().flat_map(|t| &t.records) {
            let slot = if record.target == INODE_BITMAP_IDX {
                &mut self.inode_bitmap
            } else if record.target == INODE_TABLE_IDX {
                &mut self.inode_table
            } else if record.target == self.root_dir_block {
                &mut self.root_dir
            } else {
                continue;
            };
            slot.copy_from_slice(&record.payload);
            applied += 1;
        }
        applied
    }
}

/// Next metadata state for one creation, not yet logged
#[derive(Debug, Clone)]
pub struct StagedCreate {
    pub inode: u32,
    pub slot: usize,
    pub free_inodes: u32,
    pub records: Vec<DataRecord>,
}

/// Validate and compute the creation against `view`; `view` is not modified
pub fn stage_create(view: &MetadataSnapshot, superblock: &Superblock, name: &str, now: u32) -> Result<StagedCreate> {
    let directory = DirectoryBlock::decode(&view.root_dir)?;
    if directory.find_by_name(name).is_some() {
        return Err(VsfsError::AlreadyExists(name.to_string()));
    }

    let mut bitmap = Bitmap::from_bytes(view.inode_bitmap.clone(), superblock.allocatable_inodes());
    if !bitmap.is_set(ROOT_INODE) {
        return Err(VsfsError::CorruptMetadata("root inode is not marked allocated".to_string()));
    }
    let inode = bitmap.find_first_clear().ok_or(VsfsError::NoFreeInodes)?;

    let slot = directory.find_free_slot().ok_or(VsfsError::NoFreeDirectorySlots)?;

    // Copies only from here on
    bitmap.set(inode);
    let free_inodes = bitmap.count_free();

    let mut inode_table = view.inode_table.clone();
    Inode::clear_slot(&mut inode_table, inode)?;
    Inode::new_file(now).write_into(&mut inode_table, inode)?;

    let mut root = Inode::read_from(&inode_table, ROOT_INODE)?;
    root.size = root.size.wrapping_add(DIR_ENTRY_SIZE as u32);
    root.mtime = now;
    root.write_into(&mut inode_table, ROOT_INODE)?;

    let mut directory = directory;
    directory.insert_at(slot, DirEntry::new(inode, name))?;

    let records = vec![
        DataRecord::new(INODE_BITMAP_IDX, bitmap.into_bytes())?,
        DataRecord::new(INODE_TABLE_IDX, inode_table)?,
        DataRecord::new(view.root_dir_block, directory.encode())?,
    ];

    Ok(StagedCreate {
        inode,
        slot,
        free_inodes,
        records,
    })
}

/// Log the creation of `name` in the root directory, stamped with `now`
pub fn create_file<D: BlockDevice + ?Sized>(device: &mut D, name: &str, now: u32) -> Result<CreateReport> {
    validate_name(name)?;

    let superblock = Superblock::decode(&device.read_block(SUPERBLOCK_IDX)?)?;
    superblock.validate()?;

    let mut journal = JournalArea::read_from(device)?;
    if !journal.exists() {
        log::info!("No journal found, initializing an empty one");
        journal.initialize();
    }
    journal.check_header()?;

    let mut view = MetadataSnapshot::load(device)?;

    let scan = journal.scan();
    match &scan.outcome {
        WalkOutcome::Clean => {}
        WalkOutcome::UncommittedTail { offset, records } => {
            log::warn!(
                "Discarding {} uncommitted journal record(s) at offset {}",
                records, offset
            );
            journal.truncate_to(scan.committed_end);
        }
        WalkOutcome::Corrupt { offset, reason } => {
            return Err(VsfsError::JournalCorrupt {
                offset: *offset,
                reason: reason.clone(),
            });
        }
    }

    let folded = view.fold(&scan.transactions);
    log::debug!(
        "Folded {} block image(s) from {} pending transaction(s)",
        folded,
        scan.transactions.len()
    );

    let staged = stage_create(&view, &superblock, name, now)?;

    journal.append_transaction(staged.records)?;
    journal.persist(device)?;
    device.sync()?;

    log::info!(
        "Logged creation of '{}' (inode {}, slot {}) to journal",
        name, staged.inode, staged.slot
    );

    Ok(CreateReport {
        name: name.to_string(),
        inode: staged.inode,
        slot: staged.slot,
        journal_bytes_used: journal.nbytes_used(),
        pending_transactions: scan.transactions.len() + 1,
        free_inodes: staged.free_inodes,
    })
}
