// VSFS Write-Ahead Journal
// Append-only log of block images sealed by commit records

pub mod area;
pub mod records;
pub mod walk;

pub use area::JournalArea;
pub use records::{DataRecord, JournalRecord, RecordError, RecordHeader};
pub use walk::{JournalScan, Transaction, WalkOutcome};

use crate::constants::*;
use serde::Serialize;
use vsfs_core::{BlockDevice, Result};

/// Read-only view of the journal's state
#[derive(Debug, Clone, Serialize)]
pub struct JournalStatus {
    /// Header magic present
    pub exists: bool,
    /// Bytes used, header included
    pub bytes_used: usize,
    /// Total journal capacity in bytes
    pub capacity: usize,
    /// Committed transactions waiting for install
    pub pending_transactions: usize,
    /// Block images those transactions will write
    pub pending_blocks: usize,
    /// Further file creations that still fit
    pub creates_remaining: usize,
    pub outcome: WalkOutcome,
}

impl JournalStatus {
    /// Inspect the journal without modifying anything
    pub fn read<D: BlockDevice + ?Sized>(device: &mut D) -> Result<Self> {
        let area = JournalArea::read_from(device)?;
        if !area.exists() {
            return Ok(Self {
                exists: false,
                bytes_used: 0,
                capacity: JOURNAL_CAPACITY,
                pending_transactions: 0,
                pending_blocks: 0,
                creates_remaining: (JOURNAL_CAPACITY - JOURNAL_HEADER_SIZE) / CREATE_TRANSACTION_SIZE,
                outcome: WalkOutcome::Clean,
            });
        }

        area.check_header()?;
        let scan = area.scan();
        Ok(Self {
            exists: true,
            bytes_used: area.nbytes_used(),
            capacity: JOURNAL_CAPACITY,
            pending_transactions: scan.transactions.len(),
            pending_blocks: scan.blocks(),
            creates_remaining: area.remaining() / CREATE_TRANSACTION_SIZE,
            outcome: scan.outcome,
        })
    }
}
