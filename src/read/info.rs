//! Archive information types.

use std::path::PathBuf;

use crate::format::detect::ArchiveType;
use crate::mapping::MappingLine;

/// Summary of an opened archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    /// Detected container type.
    pub archive_type: ArchiveType,
    /// Number of top-level entries.
    pub entry_count: usize,
    /// Number of entries holding an embedded bundle.
    pub bundle_count: usize,
    /// Sum of the top-level entry sizes.
    pub payload_size: u64,
    /// Size of the archive file.
    pub file_size: u64,
}

impl ArchiveInfo {
    /// Returns the bytes spent on headers and entry records.
    pub fn overhead(&self) -> u64 {
        self.file_size.saturating_sub(self.payload_size)
    }
}

/// Result of an extraction operation.
#[must_use = "extraction results carry the output folder and manifest"]
#[derive(Debug, Clone, Default)]
pub struct ExtractResult {
    /// The folder the archive was extracted into (`dest/<archive stem>`).
    pub out_dir: PathBuf,
    /// The top-level manifest lines; empty for bundles.
    pub mapping_lines: Vec<MappingLine>,
    /// Number of payload files written, at every depth.
    pub files_written: usize,
}
