// VSFS Session
// One exclusive session against an image: log creations, install, inspect

use crate::constants::*;
use crate::create::{create_file, CreateReport};
use crate::install::{install, InstallReport};
use crate::journal::JournalStatus;
use chrono::Utc;
use std::path::Path;
use vsfs_core::{BlockDevice, FileBlockDevice, Result, VsfsError};

/// A VSFS image opened for journaled metadata updates.
///
/// The caller guarantees nothing else mutates the image while the session
/// is alive; there is no locking.
pub struct Vsfs<D: BlockDevice> {
    device: D,
}

impl Vsfs<FileBlockDevice> {
    /// Open an image file, which must hold the whole fixed layout
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let device = FileBlockDevice::open(path, BLOCK_SIZE)?;
        if device.num_blocks() < TOTAL_BLOCKS {
            log::debug!(
                "Image {} holds {} blocks, layout needs {}",
                device.path().display(),
                device.num_blocks(),
                TOTAL_BLOCKS
            );
            return Err(VsfsError::BlockOutOfRange {
                block: TOTAL_BLOCKS - 1,
                total: device.num_blocks(),
            });
        }
        Ok(Self::new(device))
    }
}

impl<D: BlockDevice> Vsfs<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }

    /// Log the creation of `name`, stamped with the current time
    pub fn create(&mut self, name: &str) -> Result<CreateReport> {
        self.create_at(name, current_timestamp())
    }

    /// Log the creation of `name` with an explicit timestamp
    pub fn create_at(&mut self, name: &str, timestamp: u32) -> Result<CreateReport> {
        create_file(&mut self.device, name, timestamp)
    }

    /// Replay the journal into the real metadata blocks
    pub fn install(&mut self) -> Result<InstallReport> {
        install(&mut self.device)
    }

    pub fn journal_status(&mut self) -> Result<JournalStatus> {
        JournalStatus::read(&mut self.device)
    }

    pub fn into_inner(self) -> D {
        self.device
    }
}

/// Seconds since the epoch, clamped into the on-disk u32 field
fn current_timestamp() -> u32 {
    Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{format_into, formatted_device};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_rejects_short_image() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; BLOCK_SIZE * 10]).unwrap();
        file.flush().unwrap();

        assert!(matches!(
            Vsfs::open(file.path()),
            Err(VsfsError::BlockOutOfRange { block, total: 10 }) if block == TOTAL_BLOCKS - 1
        ));
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Vsfs::open(dir.path().join("absent.img")),
            Err(VsfsError::IoError(_))
        ));
    }

    #[test]
    fn test_session_on_file_image() {
        let file = NamedTempFile::new().unwrap();
        file.as_file().set_len((TOTAL_BLOCKS as usize * BLOCK_SIZE) as u64).unwrap();
        {
            let mut device = FileBlockDevice::open(file.path(), BLOCK_SIZE).unwrap();
            format_into(&mut device);
        }

        let mut fs = Vsfs::open(file.path()).unwrap();
        let report = fs.create("notes").unwrap();
        assert_eq!(report.inode, 1);
        assert!(fs.journal_status().unwrap().exists);
        assert_eq!(fs.install().unwrap().transactions, 1);
    }

    #[test]
    fn test_create_stamps_current_time() {
        let before = current_timestamp();
        let mut fs = Vsfs::new(formatted_device());
        fs.create("now").unwrap();
        fs.install().unwrap();

        let mut device = fs.into_inner();
        let inode = crate::test_helpers::read_inode(&mut device, 1);
        assert!(inode.ctime >= before);
        assert_eq!(inode.ctime, inode.mtime);
    }

    #[test]
    fn test_status_tracks_pending_work() {
        let mut fs = Vsfs::new(formatted_device());
        let status = fs.journal_status().unwrap();
        assert!(!status.exists);
        assert_eq!(status.creates_remaining, 5);

        fs.create_at("a", 1).unwrap();
        let status = fs.journal_status().unwrap();
        assert_eq!(status.pending_transactions, 1);
        assert_eq!(status.pending_blocks, 3);
        assert_eq!(status.creates_remaining, 4);
        assert_eq!(status.bytes_used, JOURNAL_HEADER_SIZE + CREATE_TRANSACTION_SIZE);

        fs.install().unwrap();
        assert_eq!(fs.journal_status().unwrap().pending_transactions, 0);
    }
}
