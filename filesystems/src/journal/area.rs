// Journal Area
// The journal blocks mirrored into one flat buffer: header, then records

use super::records::{DataRecord, JournalRecord};
use super::walk::{self, JournalScan};
use crate::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use vsfs_core::{BlockDevice, Result, VsfsError};

/// In-memory copy of the whole journal area. Nothing reaches the device
/// until `persist` writes the assembled buffer back.
#[derive(Debug, Clone)]
pub struct JournalArea {
    buffer: Vec<u8>,
}

impl JournalArea {
    /// Fresh, empty journal (header only)
    pub fn new() -> Self {
        let mut area = Self {
            buffer: vec![0u8; JOURNAL_CAPACITY],
        };
        area.initialize();
        area
    }

    /// Read all journal blocks from the device
    pub fn read_from<D: BlockDevice + ?Sized>(device: &mut D) -> Result<Self> {
        let mut buffer = Vec::with_capacity(JOURNAL_CAPACITY);
        for i in 0..JOURNAL_BLOCKS {
            buffer.extend_from_slice(&device.read_block(JOURNAL_START_IDX + i)?);
        }
        if buffer.len() != JOURNAL_CAPACITY {
            return Err(VsfsError::InvalidBlockSize {
                expected: BLOCK_SIZE,
                actual: buffer.len() / JOURNAL_BLOCKS as usize,
            });
        }
        Ok(Self { buffer })
    }

    /// Write the whole buffer back to the journal blocks
    pub fn persist<D: BlockDevice + ?Sized>(&self, device: &mut D) -> Result<()> {
        for (i, block) in self.buffer.chunks_exact(BLOCK_SIZE).enumerate() {
            device.write_block(JOURNAL_START_IDX + i as u32, block)?;
        }
        log::debug!("Persisted journal ({} of {} bytes used)", self.nbytes_used(), JOURNAL_CAPACITY);
        Ok(())
    }

    pub fn magic(&self) -> u32 {
        LittleEndian::read_u32(&self.buffer[0..4])
    }

    pub fn exists(&self) -> bool {
        self.magic() == JOURNAL_MAGIC
    }

    /// Bytes used, counted from byte 0 (header included)
    pub fn nbytes_used(&self) -> usize {
        LittleEndian::read_u32(&self.buffer[4..8]) as usize
    }

    fn set_nbytes_used(&mut self, used: usize) {
        LittleEndian::write_u32(&mut self.buffer[4..8], used as u32);
    }

    /// Stamp a header with no records
    pub fn initialize(&mut self) {
        LittleEndian::write_u32(&mut self.buffer[0..4], JOURNAL_MAGIC);
        self.set_nbytes_used(JOURNAL_HEADER_SIZE);
    }

    /// Drop every record; magic stays
    pub fn reset(&mut self) {
        self.initialize();
    }

    pub fn is_empty(&self) -> bool {
        self.nbytes_used() == JOURNAL_HEADER_SIZE
    }

    pub fn remaining(&self) -> usize {
        JOURNAL_CAPACITY.saturating_sub(self.nbytes_used())
    }

    /// Header sanity: magic present and `nbytes_used` inside the area
    pub fn check_header(&self) -> Result<()> {
        if !self.exists() {
            return Err(VsfsError::JournalMissing);
        }
        let used = self.nbytes_used();
        if !(JOURNAL_HEADER_SIZE..=JOURNAL_CAPACITY).contains(&used) {
            return Err(VsfsError::JournalCorrupt {
                offset: 4,
                reason: format!(
                    "header claims {} bytes used (valid range {}..={})",
                    used, JOURNAL_HEADER_SIZE, JOURNAL_CAPACITY
                ),
            });
        }
        Ok(())
    }

    /// Walk the used region. Call `check_header` first.
    pub fn scan(&self) -> JournalScan {
        walk::walk(&self.buffer, self.nbytes_used().min(JOURNAL_CAPACITY))
    }

    /// Rewind the used boundary, forgetting everything after `offset`
    pub fn truncate_to(&mut self, offset: usize) {
        let used = self.nbytes_used();
        if offset < JOURNAL_HEADER_SIZE || offset >= used {
            return;
        }
        self.buffer[offset..used].fill(0);
        self.set_nbytes_used(offset);
    }

    /// Append one record at the used boundary
    pub fn append(&mut self, record: &JournalRecord) -> Result<()> {
        let needed = record.encoded_len();
        if needed > self.remaining() {
            return Err(VsfsError::JournalFull {
                needed,
                available: self.remaining(),
            });
        }

        let offset = self.nbytes_used();
        record.encode_into(&mut self.buffer[offset..offset + needed]);
        self.set_nbytes_used(offset + needed);
        Ok(())
    }

    /// Append `records` followed by a commit record, or nothing at all
    pub fn append_transaction(&mut self, records: Vec<DataRecord>) -> Result<()> {
        let needed = records.len() * DATA_RECORD_SIZE + COMMIT_RECORD_SIZE;
        if needed > self.remaining() {
            return Err(VsfsError::JournalFull {
                needed,
                available: self.remaining(),
            });
        }

        for record in records {
            self.append(&JournalRecord::Data(record))?;
        }
        self.append(&JournalRecord::Commit)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}

impl Default for JournalArea {
    fn default() -> Self {
        Self::new()
    }
}
