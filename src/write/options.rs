//! Save results.

use std::path::PathBuf;

use crate::format::detect::ArchiveType;

/// Result of a save operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveResult {
    /// The file that was written.
    pub path: PathBuf,
    /// The container type that was written.
    pub archive_type: ArchiveType,
    /// Number of entries (or chunks) in the written container.
    pub entries_written: usize,
    /// Size of the written file.
    pub bytes_written: u64,
}

impl SaveResult {
    /// Returns the average payload size per entry, header included.
    pub fn average_entry_size(&self) -> u64 {
        if self.entries_written == 0 {
            0
        } else {
            self.bytes_written / self.entries_written as u64
        }
    }
}
