// Journal Walk
// Groups the used region into committed transactions, shared by fold and replay

use super::records::{DataRecord, JournalRecord};
use crate::constants::*;
use serde::Serialize;

/// A run of data records sealed by a commit record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Offset of the first record
    pub start: usize,
    /// Offset one past the commit record
    pub end: usize,
    /// Data records in log order
    pub records: Vec<DataRecord>,
}

/// How the walk ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WalkOutcome {
    /// Every used byte belongs to a committed transaction
    Clean,
    /// Well-formed data records with no commit after them
    UncommittedTail { offset: usize, records: usize },
    /// The walk stopped at a record it could not trust
    Corrupt { offset: usize, reason: String },
}

/// Result of walking the journal
#[derive(Debug, Clone)]
pub struct JournalScan {
    pub transactions: Vec<Transaction>,
    /// Offset one past the last commit record (header size if none)
    pub committed_end: usize,
    pub outcome: WalkOutcome,
}

impl JournalScan {
    pub fn blocks(&self) -> usize {
        self.transactions.iter().map(|t| t.records.len()).sum()
    }
}

/// Data records may only target blocks past the journal, inside the image
pub fn is_valid_target(block: u32) -> bool {
    (INODE_BITMAP_IDX..TOTAL_BLOCKS).contains(&block)
}

/// Walk `journal[JOURNAL_HEADER_SIZE..nbytes_used]`. The caller guarantees
/// `nbytes_used` lies within the buffer.
pub fn walk(journal: &[u8], nbytes_used: usize) -> JournalScan {
    let used = &journal[..nbytes_used];
    let mut transactions = Vec::new();
    let mut pending: Vec<DataRecord> = Vec::new();
    let mut txn_start = JOURNAL_HEADER_SIZE;
    let mut offset = JOURNAL_HEADER_SIZE;

    let outcome = loop {
        if offset >= nbytes_used {
            break if pending.is_empty() {
                WalkOutcome::Clean
            } else {
                WalkOutcome::UncommittedTail {
                    offset: txn_start,
                    records: pending.len(),
                }
            };
        }

        let record = match JournalRecord::decode(&used[offset..]) {
            Ok(record) => record,
            Err(e) => {
                break WalkOutcome::Corrupt {
                    offset,
                    reason: e.to_string(),
                }
            }
        };

        match record {
            JournalRecord::Data(data) => {
                if !is_valid_target(data.target) {
                    break WalkOutcome::Corrupt {
                        offset,
                        reason: format!("data record targets block {} outside the metadata region", data.target),
                    };
                }
                log::debug!("Journal offset {}: data record for block {}", offset, data.target);
                offset += DATA_RECORD_SIZE;
                pending.push(data);
            }
            JournalRecord::Commit => {
                offset += COMMIT_RECORD_SIZE;
                log::debug!(
                    "Journal offset {}: commit closes transaction {} ({} blocks)",
                    offset - COMMIT_RECORD_SIZE,
                    transactions.len() + 1,
                    pending.len()
                );
                transactions.push(Transaction {
                    start: txn_start,
                    end: offset,
                    records: std::mem::take(&mut pending),
                });
                txn_start = offset;
            }
        }
    };

    JournalScan {
        transactions,
        committed_end: txn_start,
        outcome,
    }
}
