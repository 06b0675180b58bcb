//! Folder classification before any archive exists.
//!
//! [`inspect_folder`] decides whether a loose folder should be saved as a
//! DSARC archive or a DSEQ bundle and lists the entries a save would
//! produce. Nothing is written.

use std::collections::BTreeSet;
use std::path::Path;

use crate::bundle::{BundleChunk, parse_bundle};
use crate::entry::{Entry, ImportResult};
use crate::format::MAPPER_FILE_NAME;
use crate::format::detect::{ArchiveKind, ArchiveType};
use crate::fs::{file_name_lossy, list_files_recursive, list_top_level, relative_name, require_dir};
use crate::mapping::{SourceRef, has_mapper, mapper_path, read_mapping_file, resolve_source};
use crate::naming::split_name;
use crate::progress::{ProgressReporter, Tracker};
use crate::rebuild::rebuild_with;
use crate::{Error, Result};

/// Classifies `folder` and lists the entries it would produce.
///
/// Rules, first match wins:
///
/// 1. A `mapper.txt` makes it an archive with one entry per manifest line.
/// 2. A folder whose files (at any depth, ignoring `mapper.txt`) cover the
///    three chunk extensions is a bundle when the files share one stem, or
///    when exactly three files carry chunk extensions and no other
///    extension is present.
/// 3. Anything else is an archive with one entry per top-level item.
///
/// Sub-folders are probed by rebuilding them; one that rebuilds to a bundle
/// becomes a bundle entry with its chunks as children. A probe that fails is
/// reported as a warning and leaves a plain entry.
///
/// # Errors
///
/// [`Error::DirectoryNotFound`] if `folder` does not exist, and
/// [`Error::Cancelled`] if `progress` requests it.
pub fn inspect_folder(
    folder: impl AsRef<Path>,
    progress: &mut dyn ProgressReporter,
) -> Result<ImportResult> {
    let folder = folder.as_ref();
    require_dir(folder)?;
    let mut tracker = Tracker::new(progress);

    let (file_type, entries) = if has_mapper(folder) {
        (ArchiveType::Archive, inspect_mapping(folder, &mut tracker)?)
    } else if let Some(entries) = inspect_bundle_shape(folder)? {
        (ArchiveType::Bundle, entries)
    } else {
        (ArchiveType::Archive, inspect_top_level(folder, &mut tracker)?)
    };

    log::debug!(
        "{} looks like a {file_type} with {} entries",
        folder.display(),
        entries.len()
    );
    Ok(ImportResult {
        file_type,
        entries,
        source_folder: folder.to_path_buf(),
    })
}

fn inspect_mapping(folder: &Path, tracker: &mut Tracker<'_>) -> Result<Vec<Entry>> {
    let lines = read_mapping_file(mapper_path(folder))?;
    tracker.add_total(lines.len() as u64);
    let mut entries = Vec::with_capacity(lines.len());
    for line in lines {
        tracker.checkpoint()?;
        tracker.start(&line.left, 0);
        let entry = match resolve_source(folder, &line.right)? {
            SourceRef::Folder(dir) => probe_folder(line.left.clone(), &dir, tracker)?,
            SourceRef::File(path) | SourceRef::Found(path) => {
                Entry::file(line.left.clone(), std::fs::metadata(path)?.len(), 0)
            }
            SourceRef::Unresolved => {
                log::debug!("'{}' has no source yet", line.right);
                Entry::named(line.left.clone())
            }
        };
        entries.push(entry);
        tracker.finish(&line.left);
    }
    Ok(entries)
}

fn inspect_bundle_shape(folder: &Path) -> Result<Option<Vec<Entry>>> {
    let files: Vec<_> = list_files_recursive(folder)?
        .into_iter()
        .filter(|p| !file_name_lossy(p).eq_ignore_ascii_case(MAPPER_FILE_NAME))
        .collect();
    let names: Vec<String> = files.iter().map(|p| file_name_lossy(p)).collect();

    let stems: BTreeSet<&str> = names.iter().map(|n| split_name(n).0).collect();
    let extensions: BTreeSet<String> = names
        .iter()
        .map(|n| split_name(n).1.to_ascii_lowercase())
        .collect();
    let canonical: BTreeSet<String> = BundleChunk::ALL
        .iter()
        .map(|c| c.extension().to_string())
        .collect();

    let common_stem = if stems.len() == 1 {
        stems.iter().next().copied()
    } else {
        None
    };
    let covers_all = canonical.is_subset(&extensions);
    let only_three = extensions == canonical
        && names
            .iter()
            .filter(|n| BundleChunk::from_extension(split_name(n).1).is_some())
            .count()
            == BundleChunk::ALL.len();
    if !((common_stem.is_some() && covers_all) || only_three) {
        return Ok(None);
    }

    let mut entries = Vec::with_capacity(BundleChunk::ALL.len());
    for chunk in BundleChunk::ALL {
        let matches_ext =
            |name: &str| split_name(name).1.eq_ignore_ascii_case(chunk.extension());
        let chosen = common_stem
            .and_then(|stem| {
                names
                    .iter()
                    .position(|n| split_name(n).0 == stem && matches_ext(n))
            })
            .or_else(|| names.iter().position(|n| matches_ext(n)))
            .ok_or(Error::MissingChunk {
                extension: chunk.extension(),
            })?;
        let path = &files[chosen];
        entries.push(Entry::file(
            relative_name(folder, path),
            std::fs::metadata(path)?.len(),
            0,
        ));
    }
    Ok(Some(entries))
}

fn inspect_top_level(folder: &Path, tracker: &mut Tracker<'_>) -> Result<Vec<Entry>> {
    let items: Vec<_> = list_top_level(folder)?
        .into_iter()
        .filter(|p| !file_name_lossy(p).eq_ignore_ascii_case(MAPPER_FILE_NAME))
        .collect();
    tracker.add_total(items.len() as u64);
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        tracker.checkpoint()?;
        let name = file_name_lossy(&item);
        tracker.start(&name, 0);
        let entry = if item.is_dir() {
            probe_folder(name.clone(), &item, tracker)?
        } else {
            Entry::file(name.clone(), std::fs::metadata(&item)?.len(), 0)
        };
        entries.push(entry);
        tracker.finish(&name);
    }
    Ok(entries)
}

/// Rebuilds `dir` in memory to find out what it holds.
fn probe_folder(name: String, dir: &Path, tracker: &mut Tracker<'_>) -> Result<Entry> {
    let bytes = match rebuild_with(dir, tracker) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Ok(Entry::named(name)),
        Err(Error::Cancelled) => return Err(Error::Cancelled),
        Err(err) => {
            tracker.warn(&format!("cannot rebuild {}: {err}", dir.display()));
            return Ok(Entry::named(name));
        }
    };

    let size = bytes.len() as u64;
    if ArchiveKind::classify(&bytes) != ArchiveKind::Bundle {
        return Ok(Entry::file(name, size, 0));
    }
    let base = split_name(crate::naming::last_component(&name)).0.to_string();
    match parse_bundle(&bytes, &base) {
        Ok(children) => Ok(Entry::bundle(name, size, 0, children)),
        Err(err) => {
            tracker.warn(&format!("{} holds a bad bundle: {err}", dir.display()));
            Ok(Entry::file(name, size, 0))
        }
    }
}
