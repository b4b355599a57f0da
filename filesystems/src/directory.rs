// Root directory block handling
// A flat array of fixed-size entries; no subdirectories, no path resolution

use crate::constants::*;
use crate::structures::DirEntry;
use vsfs_core::{Result, VsfsError};

/// Check a filename before it goes anywhere near the directory
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VsfsError::EmptyName);
    }
    if name.len() >= NAME_LEN {
        return Err(VsfsError::NameTooLong {
            len: name.len(),
            max: NAME_LEN - 1,
        });
    }
    if name.contains('\0') {
        return Err(VsfsError::InvalidName(format!("{:?} contains a NUL byte", name)));
    }
    if name.contains('/') {
        return Err(VsfsError::InvalidName(format!("{:?} contains a path separator", name)));
    }
    Ok(())
}

/// Decoded directory block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBlock {
    entries: Vec<DirEntry>,
}

impl DirectoryBlock {
    pub fn decode(block: &[u8]) -> Result<Self> {
        if block.len() != BLOCK_SIZE {
            return Err(VsfsError::InvalidBlockSize {
                expected: BLOCK_SIZE,
                actual: block.len(),
            });
        }

        let entries = block
            .chunks_exact(DIR_ENTRY_SIZE)
            .map(DirEntry::decode)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut block = vec![0u8; BLOCK_SIZE];
        for (entry, raw) in self.entries.iter().zip(block.chunks_exact_mut(DIR_ENTRY_SIZE)) {
            entry.encode_into(raw);
        }
        block
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    /// First free slot in array order
    pub fn find_free_slot(&self) -> Option<usize> {
        self.entries.iter().position(DirEntry::is_free)
    }

    /// Exact, case-sensitive lookup among occupied entries
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| !entry.is_free() && entry.name_bytes() == name.as_bytes())
    }

    pub fn occupied(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().filter(|entry| !entry.is_free())
    }

    /// Place `entry` in `slot`, which must be free
    pub fn insert_at(&mut self, slot: usize, entry: DirEntry) -> Result<()> {
        match self.entries.get(slot) {
            Some(existing) if existing.is_free() => {
                self.entries[slot] = entry;
                Ok(())
            }
            Some(existing) => Err(VsfsError::CorruptMetadata(format!(
                "directory slot {} already holds '{}'",
                slot,
                existing.name_lossy()
            ))),
            None => Err(VsfsError::NoFreeDirectorySlots),
        }
    }
}
