pub mod device;
pub mod error;

pub use device::{BlockDevice, FileBlockDevice, MemoryBlockDevice};
pub use error::{Result, VsfsError};
