use thiserror::Error;

#[derive(Debug, Error)]
pub enum VsfsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid block size: expected {expected}, got {actual}")]
    InvalidBlockSize { expected: usize, actual: usize },

    #[error("Block {block} out of range (device has {total} blocks)")]
    BlockOutOfRange { block: u32, total: u32 },

    #[error("Invalid superblock: {0}")]
    InvalidSuperblock(String),

    #[error("Corrupt metadata: {0}")]
    CorruptMetadata(String),

    #[error("Filename cannot be empty")]
    EmptyName,

    #[error("Filename too long: {len} bytes (maximum {max})")]
    NameTooLong { len: usize, max: usize },

    #[error("Invalid filename: {0}")]
    InvalidName(String),

    #[error("File '{0}' already exists")]
    AlreadyExists(String),

    #[error("No free inodes available")]
    NoFreeInodes,

    #[error("No free directory entry slots")]
    NoFreeDirectorySlots,

    #[error("Insufficient journal space ({needed} bytes needed, {available} available). Please run 'install' first")]
    JournalFull { needed: usize, available: usize },

    #[error("Journal does not exist")]
    JournalMissing,

    #[error("Journal corrupt at offset {offset}: {reason}")]
    JournalCorrupt { offset: usize, reason: String },
}

impl VsfsError {
    /// Validation faults abort an operation before anything is persisted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            VsfsError::EmptyName
                | VsfsError::NameTooLong { .. }
                | VsfsError::InvalidName(_)
                | VsfsError::AlreadyExists(_)
                | VsfsError::NoFreeInodes
                | VsfsError::NoFreeDirectorySlots
                | VsfsError::JournalFull { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, VsfsError>;
