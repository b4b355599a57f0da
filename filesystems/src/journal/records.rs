// Journal Record Codec
// Every record starts with a (type, size) header; the size is the only way a reader advances

use crate::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use vsfs_core::{Result, VsfsError};

/// Common prefix of every record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub record_type: u16,
    pub size: u16,
}

impl RecordHeader {
    fn read(data: &[u8]) -> Self {
        Self {
            record_type: LittleEndian::read_u16(&data[0..2]),
            size: LittleEndian::read_u16(&data[2..4]),
        }
    }

    fn write(&self, data: &mut [u8]) {
        LittleEndian::write_u16(&mut data[0..2], self.record_type);
        LittleEndian::write_u16(&mut data[2..4], self.size);
    }
}

/// Full image of one block, destined for `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    pub target: u32,
    pub payload: Vec<u8>,
}

impl DataRecord {
    pub fn new(target: u32, payload: Vec<u8>) -> Result<Self> {
        if payload.len() != BLOCK_SIZE {
            return Err(VsfsError::InvalidBlockSize {
                expected: BLOCK_SIZE,
                actual: payload.len(),
            });
        }
        Ok(Self { target, payload })
    }
}

/// A decoded journal record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalRecord {
    Data(DataRecord),
    Commit,
}

/// Why a record could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The record runs past the used region
    Truncated { needed: usize, available: usize },
    UnknownType(u16),
    /// Declared size disagrees with the record type
    BadSize { record_type: u16, size: u16, expected: usize },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Truncated { needed, available } => write!(
                f,
                "record needs {} bytes but only {} remain in the used region",
                needed, available
            ),
            RecordError::UnknownType(t) => write!(f, "unknown record type {}", t),
            RecordError::BadSize {
                record_type,
                size,
                expected,
            } => write!(
                f,
                "record type {} declares size {} (expected {})",
                record_type, size, expected
            ),
        }
    }
}

impl JournalRecord {
    pub fn record_type(&self) -> u16 {
        match self {
            JournalRecord::Data(_) => REC_DATA,
            JournalRecord::Commit => REC_COMMIT,
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            JournalRecord::Data(_) => DATA_RECORD_SIZE,
            JournalRecord::Commit => COMMIT_RECORD_SIZE,
        }
    }

    /// Write the record at the start of `data`, which must hold `encoded_len()` bytes
    pub fn encode_into(&self, data: &mut [u8]) {
        let header = RecordHeader {
            record_type: self.record_type(),
            size: self.encoded_len() as u16,
        };
        header.write(data);

        if let JournalRecord::Data(record) = self {
            let body = &mut data[RECORD_HEADER_SIZE..DATA_RECORD_SIZE];
            LittleEndian::write_u32(&mut body[0..4], record.target);
            body[4..].copy_from_slice(&record.payload);
        }
    }

    /// Decode the record at the start of `data`. `data` ends at the used
    /// boundary, so nothing past it is ever read.
    pub fn decode(data: &[u8]) -> std::result::Result<Self, RecordError> {
        if data.len() < RECORD_HEADER_SIZE {
            return Err(RecordError::Truncated {
                needed: RECORD_HEADER_SIZE,
                available: data.len(),
            });
        }

        let header = RecordHeader::read(data);
        let expected = match header.record_type {
            REC_DATA => DATA_RECORD_SIZE,
            REC_COMMIT => COMMIT_RECORD_SIZE,
            other => return Err(RecordError::UnknownType(other)),
        };

        if header.size as usize != expected {
            return Err(RecordError::BadSize {
                record_type: header.record_type,
                size: header.size,
                expected,
            });
        }
        if data.len() < expected {
            return Err(RecordError::Truncated {
                needed: expected,
                available: data.len(),
            });
        }

        match header.record_type {
            REC_DATA => {
                let body = &data[RECORD_HEADER_SIZE..DATA_RECORD_SIZE];
                Ok(JournalRecord::Data(DataRecord {
                    target: LittleEndian::read_u32(&body[0..4]),
                    payload: body[4..].to_vec(),
                }))
            }
            _ => Ok(JournalRecord::Commit),
        }
    }
}
