// Journal Replay
// Copies committed block images to their home locations, then empties the journal

use crate::journal::{JournalArea, WalkOutcome};
use serde::Serialize;
use vsfs_core::{BlockDevice, Result};

/// Where a replay walk stopped on a record it could not trust
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayHalt {
    pub offset: usize,
    pub reason: String,
}

/// Outcome of an install
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Nothing was logged; no block was written
    pub was_empty: bool,
    /// Committed transactions replayed
    pub transactions: usize,
    /// Block images written to their targets
    pub blocks_written: usize,
    /// Data records dropped because no commit followed them
    pub discarded_tail: usize,
    pub halted: Option<ReplayHalt>,
}

impl InstallReport {
    fn empty() -> Self {
        Self {
            was_empty: true,
            transactions: 0,
            blocks_written: 0,
            discarded_tail: 0,
            halted: None,
        }
    }
}

/// Replay every committed transaction in log order and reset the journal.
///
/// A missing journal or an impossible header fails before anything is
/// written. A walk that stops on corruption still replays the transactions
/// before it; the halt is carried in the report.
pub fn install<D: BlockDevice + ?Sized>(device: &mut D) -> Result<InstallReport> {
    let mut journal = JournalArea::read_from(device)?;
    journal.check_header()?;

    if journal.is_empty() {
        log::info!("Journal is empty, nothing to install");
        return Ok(InstallReport::empty());
    }

    let scan = journal.scan();

    let mut blocks_written = 0;
    for (i, transaction) in scan.transactions.iter().enumerate() {
        for record in &transaction.records {
            log::debug!("Replaying transaction {}: block {}", i + 1, record.target);
            device.write_block(record.target, &record.payload)?;
            blocks_written += 1;
        }
    }
    device.sync()?;

    let mut report = InstallReport {
        was_empty: false,
        transactions: scan.transactions.len(),
        blocks_written,
        discarded_tail: 0,
        halted: None,
    };

    match scan.outcome {
        WalkOutcome::Clean => {}
        WalkOutcome::UncommittedTail { offset, records } => {
            log::warn!(
                "Discarded {} uncommitted journal record(s) at offset {}",
                records, offset
            );
            report.discarded_tail = records;
        }
        WalkOutcome::Corrupt { offset, reason } => {
            log::warn!("Journal replay halted at offset {}: {}", offset, reason);
            report.halted = Some(ReplayHalt { offset, reason });
        }
    }

    journal.reset();
    journal.persist(device)?;
    device.sync()?;

    log::info!(
        "Installed {} transaction(s), {} block(s) written",
        report.transactions, report.blocks_written
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::create::create_file;
    use crate::journal::{DataRecord, JournalRecord};
    use crate::test_helpers::{formatted_device, read_dir, read_inode};
    use vsfs_core::{MemoryBlockDevice, VsfsError};

    const NOW: u32 = 1_700_000_000;

    #[test]
    fn test_missing_journal_is_an_error() {
        let mut device = formatted_device();
        assert!(matches!(install(&mut device), Err(VsfsError::JournalMissing)));
        assert!(device.write_log().is_empty());
    }

    #[test]
    fn test_empty_journal_writes_nothing() {
        let mut device = formatted_device();
        JournalArea::new().persist(&mut device).unwrap();
        device.clear_write_log();

        let report = install(&mut device).unwrap();
        assert!(report.was_empty);
        assert_eq!(report.transactions, 0);
        assert!(device.write_log().is_empty());
    }

    #[test]
    fn test_replay_applies_creates() {
        let mut device = formatted_device();
        create_file(&mut device, "a.txt", NOW).unwrap();
        create_file(&mut device, "b.txt", NOW + 5).unwrap();
        device.clear_write_log();

        let report = install(&mut device).unwrap();
        assert_eq!(report.transactions, 2);
        assert_eq!(report.blocks_written, 6);
        assert_eq!(report.halted, None);

        // Six replay writes in log order, then the journal reset
        let log = device.write_log();
        assert_eq!(
            &log[..6],
            &[
                INODE_BITMAP_IDX,
                INODE_TABLE_IDX,
                DATA_START_IDX,
                INODE_BITMAP_IDX,
                INODE_TABLE_IDX,
                DATA_START_IDX
            ]
        );
        assert_eq!(device.sync_count(), 4);

        let names: Vec<String> = read_dir(&mut device).occupied().map(|e| e.name_lossy()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(read_inode(&mut device, 2).ctime, NOW + 5);
        assert_eq!(read_inode(&mut device, ROOT_INODE).size, 2 * DIR_ENTRY_SIZE as u32);

        let journal = JournalArea::read_from(&mut device).unwrap();
        assert!(journal.exists());
        assert!(journal.is_empty());
    }

    #[test]
    fn test_uncommitted_tail_is_not_replayed() {
        let mut device = formatted_device();
        create_file(&mut device, "a", NOW).unwrap();

        let mut journal = JournalArea::read_from(&mut device).unwrap();
        let torn = DataRecord::new(DATA_START_IDX + 3, vec![0xAB; BLOCK_SIZE]).unwrap();
        journal.append(&JournalRecord::Data(torn)).unwrap();
        journal.persist(&mut device).unwrap();

        let report = install(&mut device).unwrap();
        assert_eq!(report.transactions, 1);
        assert_eq!(report.discarded_tail, 1);
        assert!(device.read_block(DATA_START_IDX + 3).unwrap().iter().all(|&b| b == 0));
        assert!(JournalArea::read_from(&mut device).unwrap().is_empty());
    }

    #[test]
    fn test_corruption_halts_after_valid_prefix() {
        let mut device = formatted_device();
        create_file(&mut device, "a", NOW).unwrap();
        create_file(&mut device, "b", NOW).unwrap();

        // Break the record type of the second transaction's first record
        let second = JOURNAL_HEADER_SIZE + CREATE_TRANSACTION_SIZE;
        let mut image = JournalArea::read_from(&mut device).unwrap().as_bytes().to_vec();
        image[second] = 0x09;
        for (i, block) in image.chunks_exact(BLOCK_SIZE).enumerate() {
            device.write_block(JOURNAL_START_IDX + i as u32, block).unwrap();
        }

        let report = install(&mut device).unwrap();
        assert_eq!(report.transactions, 1);
        let halt = report.halted.unwrap();
        assert_eq!(halt.offset, second);
        assert!(halt.reason.contains("unknown record type 9"));

        let names: Vec<String> = read_dir(&mut device).occupied().map(|e| e.name_lossy()).collect();
        assert_eq!(names, vec!["a"]);
        assert!(JournalArea::read_from(&mut device).unwrap().is_empty());
    }

    #[test]
    fn test_bad_header_leaves_device_untouched() {
        let mut device = formatted_device();
        let mut block = vec![0u8; BLOCK_SIZE];
        block[0..4].copy_from_slice(&JOURNAL_MAGIC.to_le_bytes());
        block[4..8].copy_from_slice(&((JOURNAL_CAPACITY + 4) as u32).to_le_bytes());
        device.write_block(JOURNAL_START_IDX, &block).unwrap();
        device.clear_write_log();

        assert!(matches!(install(&mut device), Err(VsfsError::JournalCorrupt { offset: 4, .. })));
        assert!(device.write_log().is_empty());
    }

    #[test]
    fn test_write_failure_propagates() {
        // A device too small to hold the data region
        let mut device = MemoryBlockDevice::new(DATA_START_IDX, BLOCK_SIZE);
        let mut journal = JournalArea::new();
        journal
            .append_transaction(vec![DataRecord::new(DATA_START_IDX + 1, vec![1; BLOCK_SIZE]).unwrap()])
            .unwrap();
        journal.persist(&mut device).unwrap();

        assert!(matches!(install(&mut device), Err(VsfsError::BlockOutOfRange { .. })));
        assert!(!JournalArea::read_from(&mut device).unwrap().is_empty());
    }
}
