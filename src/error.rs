//! Error types for DSARC archive and DSEQ bundle operations.
//!
//! This module provides the [`Error`] enum which represents every failure
//! mode of the codecs and the rebuild engine, along with a convenient
//! [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. Codec
//! failures are never recovered locally: a corrupt header or an entry that
//! points outside its container always reaches the caller as a typed error.
//!
//! ```rust,no_run
//! use dsarc::{Error, LoadedArchive};
//!
//! fn open(path: &str) -> dsarc::Result<()> {
//!     match LoadedArchive::open_path(path) {
//!         Ok(archive) => {
//!             println!("{} entries", archive.entries().len());
//!             Ok(())
//!         }
//!         Err(Error::CorruptHeader { offset, reason }) => {
//!             eprintln!("corrupt header at {offset:#x}: {reason}");
//!             Err(Error::CorruptHeader { offset, reason })
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;

/// Helper struct for formatting `MissingSources` error messages.
struct MissingSourcesDisplay<'a> {
    references: &'a [String],
}

impl std::fmt::Display for MissingSourcesDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} referenced source(s) could not be found",
            self.references.len()
        )?;
        for (i, reference) in self.references.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{sep}{reference}")?;
        }
        Ok(())
    }
}

fn missing_display(references: &[String]) -> MissingSourcesDisplay<'_> {
    MissingSourcesDisplay { references }
}

/// The main error type for archive and bundle operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | I/O | [`Io`][Self::Io], [`DirectoryNotFound`][Self::DirectoryNotFound] | File system operations |
/// | Format | [`CorruptHeader`][Self::CorruptHeader], [`UnsupportedVersion`][Self::UnsupportedVersion] | Invalid container data |
/// | Bounds | [`EntryOutOfBounds`][Self::EntryOutOfBounds], [`ChunkOutOfBounds`][Self::ChunkOutOfBounds] | Truncated or hostile containers |
/// | Build | [`MissingChunk`][Self::MissingChunk], [`UnsupportedChunk`][Self::UnsupportedChunk], [`InvalidTagLength`][Self::InvalidTagLength] | Incomplete bundle input |
/// | Rebuild | [`MissingSources`][Self::MissingSources], [`UndeterminedArchiveType`][Self::UndeterminedArchiveType], [`ReferenceCycle`][Self::ReferenceCycle] | Folder layout problems |
/// | Control | [`Cancelled`][Self::Cancelled], [`InvalidArgument`][Self::InvalidArgument] | Caller requests |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The container header is corrupt, truncated or carries the wrong
    /// signature.
    #[error("Corrupt header at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// The byte offset where the problem was detected.
        offset: u64,
        /// A description of the problem.
        reason: String,
    },

    /// The archive declares a format version other than 1.
    ///
    /// Entries are never read when this is returned.
    #[error("Unsupported DSARC version {version}")]
    UnsupportedVersion {
        /// The version found in the header.
        version: i32,
    },

    /// An archive entry's declared range exceeds the archive length.
    #[error(
        "Entry {index} ({name}) exceeds bounds: offset {offset} + size {size} > length {length}"
    )]
    EntryOutOfBounds {
        /// Index of the entry in the entry table.
        index: usize,
        /// Decoded entry name.
        name: String,
        /// Declared offset.
        offset: i64,
        /// Declared size.
        size: i64,
        /// Length of the archive.
        length: u64,
    },

    /// A bundle chunk's declared range exceeds the bundle length.
    #[error("{chunk} chunk exceeds bounds: offset {offset} + size {size} > length {length}")]
    ChunkOutOfBounds {
        /// Chunk label (`SSEQ`, `SBNK` or `SWAR`).
        chunk: &'static str,
        /// Declared offset (after removing the header bias).
        offset: i64,
        /// Declared size.
        size: i64,
        /// Length of the bundle.
        length: u64,
    },

    /// A bundle build was requested without one of the canonical chunks.
    #[error("Missing {extension} chunk")]
    MissingChunk {
        /// The canonical extension that is missing.
        extension: &'static str,
    },

    /// A chunk operation named an extension that is not one of the
    /// canonical bundle extensions.
    #[error("Unsupported chunk extension '{extension}'")]
    UnsupportedChunk {
        /// The extension that was requested.
        extension: String,
    },

    /// The optional bundle tag was supplied with a length other than 4.
    #[error("Bundle tag must be exactly 4 bytes, got {length}")]
    InvalidTagLength {
        /// Length of the supplied tag.
        length: usize,
    },

    /// One or more sources referenced during a build could not be resolved.
    ///
    /// Carries every unresolved reference, not only the first.
    #[error("{}", missing_display(.references))]
    MissingSources {
        /// The unresolved references, in the order they were encountered.
        references: Vec<String>,
    },

    /// A folder matches none of the rebuildable layouts.
    #[error("Cannot determine archive type to rebuild at {}", .folder.display())]
    UndeterminedArchiveType {
        /// The folder that was inspected.
        folder: PathBuf,
    },

    /// A manifest reference leads back to a folder that is already being
    /// rebuilt.
    #[error("Manifest reference cycle at {}", .folder.display())]
    ReferenceCycle {
        /// The folder reached a second time.
        folder: PathBuf,
    },

    /// A folder required by the operation does not exist.
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// The caller passed arguments the operation cannot work with.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation was cancelled by the caller.
    ///
    /// Returned when a [`ProgressReporter`] asks for cancellation. Files
    /// already written by an extraction stay on disk; builds never write
    /// their output.
    ///
    /// [`ProgressReporter`]: crate::progress::ProgressReporter
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Creates a [`Error::CorruptHeader`] at the given offset.
    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptHeader {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a data corruption error.
    ///
    /// Header, version and bounds failures all count: each means the bytes
    /// on disk do not form a valid container.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CorruptHeader { .. }
                | Error::UnsupportedVersion { .. }
                | Error::EntryOutOfBounds { .. }
                | Error::ChunkOutOfBounds { .. }
        )
    }

    /// Returns `true` if the operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns the entry index associated with this error, if any.
    pub fn entry_index(&self) -> Option<usize> {
        match self {
            Error::EntryOutOfBounds { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// A specialized Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;
