//! Archive writing API.
//!
//! [`save_archive`] writes an edited entry list back to disk, pulling every
//! payload from a source folder. All bytes are gathered in memory first; the
//! output file is only created once nothing is missing.
//!
//! # Example
//!
//! ```rust,no_run
//! use dsarc::import::inspect_folder;
//! use dsarc::progress::NoProgress;
//! use dsarc::write::save_archive;
//!
//! # fn main() -> dsarc::Result<()> {
//! let import = inspect_folder("loose", &mut NoProgress)?;
//! let result = save_archive(
//!     "loose.dat",
//!     import.file_type,
//!     &import.entries,
//!     &import.source_folder,
//!     &mut NoProgress,
//! )?;
//! println!("wrote {} entries", result.entries_written);
//! # Ok(())
//! # }
//! ```

mod options;

pub use options::SaveResult;

use std::path::{Path, PathBuf};

use crate::archive::build_from_pairs;
use crate::bundle::{BundleChunk, ChunkSet, build_bundle};
use crate::entry::Entry;
use crate::format::detect::ArchiveType;
use crate::fs::{file_name_lossy, read_file, require_dir, write_file};
use crate::mapping::{SourceRef, has_mapper, resolve_source};
use crate::naming::split_name;
use crate::progress::{ProgressReporter, Tracker};
use crate::rebuild::{build_manifest_with, rebuild_with, select_bundle_sources};
use crate::{Error, Result};

/// Saves `entries` as a container of type `archive_type` at `path`.
///
/// For bundles, each chunk comes from the entry carrying its extension
/// (resolved under `src_folder`), else from the first top-level item with
/// that extension. The tag is read from `<stem>.txt` next to the sequence
/// chunk, else from `<folder name>.txt`.
///
/// For archives, `src_folder/mapper.txt` wins when present and `entries`
/// only has to be non-empty. Otherwise each entry name is resolved like a
/// manifest reference: a folder is rebuilt, a file is read, and a file of
/// the same name anywhere below `src_folder` is the last resort.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] if `entries` is empty.
/// - [`Error::DirectoryNotFound`] if `src_folder` does not exist.
/// - [`Error::MissingSources`] listing every entry without a source.
/// - [`Error::MissingChunk`] if a bundle chunk has no candidate at all.
/// - [`Error::ReferenceCycle`] if a manifest reference loops back to a
///   folder that is already being rebuilt.
/// - [`Error::Cancelled`] if `progress` requests it. Nothing is written.
pub fn save_archive(
    path: impl AsRef<Path>,
    archive_type: ArchiveType,
    entries: &[Entry],
    src_folder: impl AsRef<Path>,
    progress: &mut dyn ProgressReporter,
) -> Result<SaveResult> {
    let path = path.as_ref();
    let src_folder = src_folder.as_ref();
    if entries.is_empty() {
        return Err(Error::InvalidArgument("no entries to save".into()));
    }
    require_dir(src_folder)?;
    let mut tracker = Tracker::new(progress);

    let (bytes, entries_written) = match archive_type {
        ArchiveType::Bundle => (
            gather_bundle_sources(entries, src_folder, &mut tracker)?,
            BundleChunk::ALL.len(),
        ),
        ArchiveType::Archive if has_mapper(src_folder) => {
            let bytes = build_manifest_with(src_folder, &mut tracker)?;
            let count = crate::archive::parse_archive(&bytes)?.len();
            (bytes, count)
        }
        ArchiveType::Archive => (
            gather_archive_entries(entries, src_folder, &mut tracker)?,
            entries.len(),
        ),
    };

    write_file(path, &bytes)?;
    log::info!(
        "saved {archive_type} with {entries_written} entries to {}",
        path.display()
    );
    Ok(SaveResult {
        path: path.to_path_buf(),
        archive_type,
        entries_written,
        bytes_written: bytes.len() as u64,
    })
}

fn gather_archive_entries(
    entries: &[Entry],
    src_folder: &Path,
    tracker: &mut Tracker<'_>,
) -> Result<Vec<u8>> {
    tracker.add_total(entries.len() as u64);
    let mut pairs = Vec::with_capacity(entries.len());
    let mut missing = Vec::new();
    for entry in entries {
        tracker.checkpoint()?;
        tracker.start(&entry.name, entry.size);
        match load_source(src_folder, &entry.name, tracker)? {
            Ok(bytes) => {
                pairs.push((entry.name.as_str(), bytes));
                tracker.finish(&entry.name);
            }
            Err(refs) => {
                missing.extend(refs);
                tracker.fail(&entry.name);
            }
        }
    }
    if !missing.is_empty() {
        return Err(Error::MissingSources { references: missing });
    }
    build_from_pairs(&pairs)
}

fn gather_bundle_sources(
    entries: &[Entry],
    src_folder: &Path,
    tracker: &mut Tracker<'_>,
) -> Result<Vec<u8>> {
    let fallbacks = select_bundle_sources(src_folder)?;
    tracker.add_total(BundleChunk::ALL.len() as u64);

    let mut chunks = ChunkSet::new();
    let mut missing = Vec::new();
    let mut sequence_source: Option<PathBuf> = None;
    for (chunk, fallback) in BundleChunk::ALL.into_iter().zip(fallbacks) {
        tracker.checkpoint()?;
        tracker.start(chunk.label(), 0);
        let named = entries
            .iter()
            .find(|e| e.extension().eq_ignore_ascii_case(chunk.extension()));

        let reference = match (named, fallback) {
            (Some(entry), fallback) => {
                let candidate = src_folder.join(&entry.name);
                if candidate.exists() {
                    entry.name.clone()
                } else if let Some(fallback) = fallback {
                    file_name_lossy(fallback.path())
                } else {
                    missing.push(entry.name.clone());
                    tracker.fail(chunk.label());
                    continue;
                }
            }
            (None, Some(fallback)) => file_name_lossy(fallback.path()),
            (None, None) => {
                return Err(Error::MissingChunk {
                    extension: chunk.extension(),
                });
            }
        };

        match load_source(src_folder, &reference, tracker)? {
            Ok(bytes) => {
                if chunk == BundleChunk::Sequence {
                    sequence_source = Some(src_folder.join(&reference));
                }
                chunks.set(chunk, bytes);
                tracker.finish(chunk.label());
            }
            Err(refs) => {
                missing.extend(refs);
                tracker.fail(chunk.label());
            }
        }
    }
    if !missing.is_empty() {
        return Err(Error::MissingSources { references: missing });
    }

    let tag = find_tag(src_folder, sequence_source.as_deref())?;
    build_bundle(&chunks, tag.as_deref())
}

/// Loads the bytes for one reference, or the references that are missing.
fn load_source(
    src_folder: &Path,
    reference: &str,
    tracker: &mut Tracker<'_>,
) -> Result<std::result::Result<Vec<u8>, Vec<String>>> {
    Ok(match resolve_source(src_folder, reference)? {
        SourceRef::Folder(dir) => match rebuild_with(&dir, tracker) {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(vec![reference.to_string()]),
            Err(Error::MissingSources { references }) => Err(references
                .into_iter()
                .map(|r| format!("{reference}/{r}"))
                .collect()),
            Err(err) => return Err(err),
        },
        SourceRef::File(path) | SourceRef::Found(path) => Ok(read_file(path)?),
        SourceRef::Unresolved => Err(vec![reference.to_string()]),
    })
}

/// Finds the bundle tag sidecar. Empty sidecars carry no tag.
fn find_tag(src_folder: &Path, sequence_source: Option<&Path>) -> Result<Option<Vec<u8>>> {
    let mut candidates = Vec::with_capacity(2);
    if let Some(source) = sequence_source {
        let name = file_name_lossy(source);
        let stem = split_name(&name).0;
        let dir = source.parent().unwrap_or(src_folder);
        candidates.push(dir.join(format!("{stem}.txt")));
    }
    candidates.push(src_folder.join(format!("{}.txt", file_name_lossy(src_folder))));

    for candidate in candidates {
        if candidate.is_file() {
            let bytes = read_file(&candidate)?;
            return Ok(if bytes.is_empty() { None } else { Some(bytes) });
        }
    }
    Ok(None)
}
