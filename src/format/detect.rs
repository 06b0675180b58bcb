//! Container detection by signature.
//!
//! Classification only ever looks at the leading bytes. The bundle signature
//! is checked before the archive signature, so a 4-byte `DSEQ` prefix wins
//! even when fewer than 8 bytes are available.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use super::reader::read_up_to;
use super::{ARCHIVE_SIGNATURE, BUNDLE_SIGNATURE};
use crate::{Error, Result};

/// The container type of an opened archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveType {
    /// A DSARC archive (`DSARC FL`).
    Archive,
    /// A standalone DSEQ bundle.
    Bundle,
}

impl ArchiveType {
    /// Returns the typical file extension for this container type.
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveType::Archive => "dat",
            ArchiveType::Bundle => "msnd",
        }
    }

    /// Returns a human-readable name for this container type.
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveType::Archive => "DSARC",
            ArchiveType::Bundle => "DSEQ",
        }
    }
}

impl std::fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What an arbitrary payload looks like.
///
/// Used by the rebuild engine to decide, once per payload, whether to
/// recurse into it or write it out verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// Starts with the DSARC signature.
    Archive,
    /// Starts with the DSEQ signature.
    Bundle,
    /// Anything else.
    Opaque,
}

impl ArchiveKind {
    /// Classifies a payload without failing.
    ///
    /// ```rust
    /// use dsarc::format::detect::ArchiveKind;
    ///
    /// assert_eq!(ArchiveKind::classify(b"DSEQ"), ArchiveKind::Bundle);
    /// assert_eq!(ArchiveKind::classify(b"DSARC FL\0\0"), ArchiveKind::Archive);
    /// assert_eq!(ArchiveKind::classify(b"DSARC"), ArchiveKind::Opaque);
    /// ```
    pub fn classify(data: &[u8]) -> Self {
        match detect_bytes(data) {
            Ok(ArchiveType::Archive) => ArchiveKind::Archive,
            Ok(ArchiveType::Bundle) => ArchiveKind::Bundle,
            Err(_) => ArchiveKind::Opaque,
        }
    }

    /// Returns `true` for either container kind.
    pub fn is_container(&self) -> bool {
        !matches!(self, ArchiveKind::Opaque)
    }
}

impl From<ArchiveType> for ArchiveKind {
    fn from(value: ArchiveType) -> Self {
        match value {
            ArchiveType::Archive => ArchiveKind::Archive,
            ArchiveType::Bundle => ArchiveKind::Bundle,
        }
    }
}

/// Detects the container type from the leading bytes of a buffer.
///
/// # Errors
///
/// Returns [`Error::CorruptHeader`] with "header too short" when fewer than
/// four bytes are given, or "magic mismatch" when neither signature matches.
pub fn detect_bytes(data: &[u8]) -> Result<ArchiveType> {
    if data.len() < BUNDLE_SIGNATURE.len() {
        return Err(Error::corrupt(0, "header too short"));
    }
    if data.starts_with(BUNDLE_SIGNATURE) {
        return Ok(ArchiveType::Bundle);
    }
    if data.starts_with(ARCHIVE_SIGNATURE) {
        return Ok(ArchiveType::Archive);
    }
    Err(Error::corrupt(0, "magic mismatch"))
}

/// Detects the container type from a reader.
///
/// Reads at most eight bytes and restores the reader position afterwards.
pub fn detect_reader<R: Read + Seek>(reader: &mut R) -> Result<ArchiveType> {
    let start_pos = reader.stream_position()?;
    let mut header = [0u8; ARCHIVE_SIGNATURE.len()];
    let bytes_read = read_up_to(reader, &mut header)?;
    reader.seek(SeekFrom::Start(start_pos))?;
    detect_bytes(&header[..bytes_read])
}

/// Detects the container type of a file on disk.
pub fn detect_path(path: impl AsRef<Path>) -> Result<ArchiveType> {
    let mut file = File::open(path.as_ref())?;
    detect_reader(&mut file)
}

/// Picks an output extension for a payload.
///
/// Wave (`SWAV`) and stream (`STRM`) payloads get their true extension;
/// anything else keeps `default_ext`. Extensions include the leading dot.
///
/// ```rust
/// use dsarc::format::detect::guess_extension;
///
/// assert_eq!(guess_extension(b"SWAV....", ".bin"), ".swav");
/// assert_eq!(guess_extension(b"STRM", ""), ".strm");
/// assert_eq!(guess_extension(b"SSEQ", ".sseq"), ".sseq");
/// ```
pub fn guess_extension<'a>(data: &[u8], default_ext: &'a str) -> &'a str {
    if data.starts_with(b"SWAV") {
        ".swav"
    } else if data.starts_with(b"STRM") {
        ".strm"
    } else {
        default_ext
    }
}
