// VSFS metadata journaling
// On-disk layout, write-ahead journal, file creation and replay

pub mod bitmap;
pub mod constants;
pub mod create;
pub mod directory;
pub mod filesystem;
pub mod install;
pub mod journal;
pub mod structures;

#[cfg(test)]
pub mod test_helpers;

pub use create::{create_file, CreateReport, MetadataSnapshot};
pub use directory::{validate_name, DirectoryBlock};
pub use filesystem::Vsfs;
pub use install::{install, InstallReport, ReplayHalt};
pub use journal::{JournalArea, JournalStatus, WalkOutcome};
pub use structures::{DirEntry, Inode, Superblock};
