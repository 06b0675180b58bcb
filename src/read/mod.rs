//! Archive reading API.
//!
//! [`LoadedArchive`] is the open-archive handle used by front ends: it
//! detects the container type, parses the entry tree and offers the
//! extract and chunk-replace operations.
//!
//! # Example
//!
//! ```rust,no_run
//! use dsarc::progress::NoProgress;
//! use dsarc::read::{ExtractOptions, LoadedArchive};
//!
//! # fn main() -> dsarc::Result<()> {
//! let archive = LoadedArchive::open_path("sound.dat")?;
//! for entry in archive.entries() {
//!     println!("{}: {} bytes", entry.name, entry.size);
//! }
//!
//! let result = archive.extract_all("out", &ExtractOptions::new().nested(true), &mut NoProgress)?;
//! println!("extracted into {}", result.out_dir.display());
//! # Ok(())
//! # }
//! ```

mod extraction;
mod info;
mod options;

pub use info::{ArchiveInfo, ExtractResult};
pub use options::ExtractOptions;

use std::path::{Path, PathBuf};

use crate::archive::{build_from_pairs, parse_archive_path};
use crate::bundle::parse_bundle;
use crate::entry::Entry;
use crate::format::detect::{ArchiveType, detect_path};
use crate::fs::{read_file, read_range};
use crate::{Error, Result};

/// An archive opened from disk.
///
/// The entry tree is parsed once at open time. Payloads are read on demand
/// from the file, so the file must not change while the handle is in use.
#[derive(Debug, Clone)]
pub struct LoadedArchive {
    path: PathBuf,
    archive_type: ArchiveType,
    entries: Vec<Entry>,
}

impl LoadedArchive {
    /// Opens an archive, detecting its type by signature.
    ///
    /// Standalone bundles are named after the file stem, so
    /// `bgm.msnd` yields `bgm.sseq`, `bgm.sbnk` and `bgm.swar`.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let archive_type = detect_path(path)?;
        let entries = match archive_type {
            ArchiveType::Archive => parse_archive_path(path)?,
            ArchiveType::Bundle => {
                let buf = read_file(path)?;
                parse_bundle(&buf, &file_stem(path))?
            }
        };
        log::debug!(
            "opened {archive_type} archive {} with {} entries",
            path.display(),
            entries.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            archive_type,
            entries,
        })
    }

    /// Returns the archive path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the detected container type.
    pub fn archive_type(&self) -> ArchiveType {
        self.archive_type
    }

    /// Returns the top-level entries in archive order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Consumes the handle, returning the entry tree.
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Finds a top-level entry by name.
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Returns the archive file name without its extension.
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }

    /// Returns a summary of the archive.
    pub fn info(&self) -> Result<ArchiveInfo> {
        Ok(ArchiveInfo {
            archive_type: self.archive_type,
            entry_count: self.entries.len(),
            bundle_count: self.entries.iter().filter(|e| e.is_bundle).count(),
            payload_size: self.entries.iter().map(|e| e.size).sum(),
            file_size: std::fs::metadata(&self.path)?.len(),
        })
    }

    /// Reads a top-level entry's payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptHeader`] if the file is shorter than the
    /// entry's declared range, which means it changed since it was opened.
    pub fn read_entry_bytes(&self, entry: &Entry) -> Result<Vec<u8>> {
        let size = usize::try_from(entry.size)
            .map_err(|_| Error::InvalidArgument(format!("entry '{}' is too large", entry.name)))?;
        let data = read_range(&self.path, entry.offset, size)?;
        if data.len() != size {
            return Err(Error::corrupt(
                entry.offset,
                format!(
                    "entry '{}' truncated: read {} of {size} bytes",
                    entry.name,
                    data.len()
                ),
            ));
        }
        Ok(data)
    }

    /// Reads a bundle chunk's payload.
    ///
    /// `parent` is the archive entry holding the bundle; pass `None` when the
    /// archive itself is a standalone bundle.
    pub fn read_chunk_bytes(&self, parent: Option<&Entry>, chunk: &Entry) -> Result<Vec<u8>> {
        let bundle = self.bundle_bytes(parent)?;
        chunk.data(&bundle).map(<[u8]>::to_vec).ok_or_else(|| {
            Error::corrupt(
                chunk.offset,
                format!("chunk '{}' runs past end of bundle", chunk.name),
            )
        })
    }

    /// Rebuilds the archive with one top-level entry's payload replaced.
    ///
    /// Every other entry keeps its name, order and bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for standalone bundles or if
    /// `entry` does not belong to this archive.
    pub fn with_entry_bytes(&self, entry: &Entry, data: &[u8]) -> Result<Vec<u8>> {
        if self.archive_type != ArchiveType::Archive {
            return Err(Error::InvalidArgument(
                "only DSARC archives have replaceable entries".into(),
            ));
        }
        let target = self
            .entries
            .iter()
            .position(|e| e == entry)
            .ok_or_else(|| {
                Error::InvalidArgument(format!("'{}' is not in this archive", entry.name))
            })?;

        let mut pairs = Vec::with_capacity(self.entries.len());
        for (index, e) in self.entries.iter().enumerate() {
            let payload = if index == target {
                data.to_vec()
            } else {
                self.read_entry_bytes(e)?
            };
            pairs.push((e.name.as_str(), payload));
        }
        build_from_pairs(&pairs)
    }

    /// Returns the bytes of the bundle that holds chunk entries.
    fn bundle_bytes(&self, parent: Option<&Entry>) -> Result<Vec<u8>> {
        match (parent, self.archive_type) {
            (Some(parent), _) if parent.is_bundle => self.read_entry_bytes(parent),
            (Some(parent), _) => Err(Error::InvalidArgument(format!(
                "entry '{}' is not a bundle",
                parent.name
            ))),
            (None, ArchiveType::Bundle) => Ok(read_file(&self.path)?),
            (None, ArchiveType::Archive) => Err(Error::InvalidArgument(
                "a parent entry is required for chunks inside a DSARC archive".into(),
            )),
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "archive".to_string())
}
