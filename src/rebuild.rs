//! Recursive rebuild and extraction of nested containers.
//!
//! [`extract_nested`] turns a container buffer into a folder tree that
//! [`rebuild_folder`] turns back into the same bytes. Folders come in three
//! shapes:
//!
//! - **Archive**: a root `mapper.txt` lists `entry=source` pairs in entry
//!   order. Sources naming a sub-folder are rebuilt recursively.
//! - **Bundle**: one item per canonical chunk extension (`.sseq`, `.sbnk`,
//!   `.swar`), preferably named `<folder>.<ext>`, plus an optional
//!   `<folder>.txt` holding the 4-byte tag. A chunk item may itself be a
//!   folder holding a nested container.
//! - **Pass-through**: exactly one file, used verbatim.
//!
//! ```text
//! sound/                  <- archive
//!   mapper.txt            bgm.msnd=bgm
//!   bgm/                  <- bundle
//!     bgm.txt
//!     bgm.sseq
//!     bgm.sbnk
//!     bgm.swar
//! ```
//!
//! Builds gather every byte in memory first and report all unresolved
//! references at once as [`Error::MissingSources`].

use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::{build_from_pairs, parse_archive};
use crate::bundle::{BundleChunk, ChunkSet, build_bundle, bundle_tag, parse_bundle};
use crate::entry::Entry;
use crate::format::MAPPER_FILE_NAME;
use crate::format::detect::{ArchiveKind, guess_extension};
use crate::fs::{
    file_name_lossy, list_files_recursive, list_top_files, list_top_level, read_file,
    relative_name, require_dir, write_file,
};
use crate::mapping::{
    MappingLine, SourceRef, has_mapper, mapper_path, read_mapping_file, resolve_source,
    write_mapping_file,
};
use crate::naming::{NameCounters, entry_file_name, split_name, unique_out_name};
use crate::progress::{NoProgress, ProgressReporter, Tracker};
use crate::{Error, Result};

/// Rebuilds the container described by `folder`.
///
/// Returns `Ok(None)` if `folder` does not exist.
///
/// # Errors
///
/// - [`Error::MissingSources`] listing every manifest reference (at any
///   depth) that could not be resolved. Nested references are prefixed with
///   the path of the folder they were found in.
/// - [`Error::UndeterminedArchiveType`] if a folder has none of the three
///   rebuildable shapes.
/// - [`Error::ReferenceCycle`] if a manifest reference leads back to a
///   folder that is already being rebuilt, e.g. `a=sub/..`.
/// - [`Error::Cancelled`] if `progress` requests it.
pub fn rebuild_folder(
    folder: impl AsRef<Path>,
    progress: &mut dyn ProgressReporter,
) -> Result<Option<Vec<u8>>> {
    let mut tracker = Tracker::new(progress);
    rebuild_with(folder.as_ref(), &mut tracker)
}

pub(crate) fn rebuild_with(folder: &Path, tracker: &mut Tracker<'_>) -> Result<Option<Vec<u8>>> {
    match gather(folder, tracker)? {
        None => Ok(None),
        Some(gathered) => gathered.into_bytes().map(Some),
    }
}

/// Builds an archive from `folder/mapper.txt`.
pub(crate) fn build_manifest_with(folder: &Path, tracker: &mut Tracker<'_>) -> Result<Vec<u8>> {
    tracker.enter_folder(folder)?;
    let gathered = gather_mapping(folder, tracker);
    tracker.leave_folder();
    gathered?.into_bytes()
}

/// Builds a DSARC archive from a folder.
///
/// Uses `mapper.txt` when present. Otherwise every file below `folder` is
/// added under its `/`-separated relative path, sorted.
pub fn build_archive_from_folder(folder: impl AsRef<Path>) -> Result<Vec<u8>> {
    let folder = folder.as_ref();
    require_dir(folder)?;
    let mut progress = NoProgress;
    let mut tracker = Tracker::new(&mut progress);
    if has_mapper(folder) {
        return build_manifest_with(folder, &mut tracker);
    }

    let mut files: Vec<(String, PathBuf)> = list_files_recursive(folder)?
        .into_iter()
        .map(|path| (relative_name(folder, &path), path))
        .collect();
    files.sort();
    let pairs = files
        .into_iter()
        .map(|(name, path)| -> Result<(String, Vec<u8>)> { Ok((name, read_file(path)?)) })
        .collect::<Result<Vec<_>>>()?;
    build_from_pairs(&pairs)
}

/// Builds a DSEQ bundle from a folder holding one item per chunk.
///
/// # Errors
///
/// - [`Error::DirectoryNotFound`] if `folder` does not exist.
/// - [`Error::MissingChunk`] naming the first extension with no candidate.
/// - [`Error::InvalidTagLength`] if `<folder>.txt` is neither empty nor
///   4 bytes long.
pub fn build_bundle_from_folder(folder: impl AsRef<Path>) -> Result<Vec<u8>> {
    let folder = folder.as_ref();
    require_dir(folder)?;
    let selected = select_bundle_sources(folder)?;
    let mut sources = Vec::with_capacity(selected.len());
    for (chunk, source) in BundleChunk::ALL.into_iter().zip(selected) {
        sources.push(source.ok_or(Error::MissingChunk {
            extension: chunk.extension(),
        })?);
    }
    let mut progress = NoProgress;
    let mut tracker = Tracker::new(&mut progress);
    gather_bundle(folder, &sources, &mut tracker)?.into_bytes()
}

/// Result of collecting the bytes for one folder.
enum Gathered {
    Bytes(Vec<u8>),
    Missing(Vec<String>),
}

impl Gathered {
    fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Gathered::Bytes(bytes) => Ok(bytes),
            Gathered::Missing(references) => Err(Error::MissingSources { references }),
        }
    }
}

/// Where a bundle chunk comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChunkSource {
    File(PathBuf),
    Folder(PathBuf),
}

impl ChunkSource {
    fn from_path(path: PathBuf) -> Self {
        if path.is_dir() {
            ChunkSource::Folder(path)
        } else {
            ChunkSource::File(path)
        }
    }

    pub(crate) fn path(&self) -> &Path {
        match self {
            ChunkSource::File(path) | ChunkSource::Folder(path) => path,
        }
    }
}

fn gather(folder: &Path, tracker: &mut Tracker<'_>) -> Result<Option<Gathered>> {
    if !folder.is_dir() {
        return Ok(None);
    }
    tracker.enter_folder(folder)?;
    let gathered = gather_layout(folder, tracker);
    tracker.leave_folder();
    gathered.map(Some)
}

/// Picks the rebuild branch for an existing folder.
fn gather_layout(folder: &Path, tracker: &mut Tracker<'_>) -> Result<Gathered> {
    if has_mapper(folder) {
        log::debug!("rebuilding archive from {}", folder.display());
        return gather_mapping(folder, tracker);
    }

    let selected = select_bundle_sources(folder)?;
    if selected.iter().all(Option::is_some) {
        log::debug!("rebuilding bundle from {}", folder.display());
        let sources: Vec<ChunkSource> = selected.into_iter().flatten().collect();
        return gather_bundle(folder, &sources, tracker);
    }

    let files = list_top_files(folder)?;
    if let [single] = files.as_slice() {
        tracker.checkpoint()?;
        let name = file_name_lossy(single);
        tracker.add_total(1);
        tracker.start(&name, 0);
        let bytes = read_file(single)?;
        tracker.finish(&name);
        return Ok(Gathered::Bytes(bytes));
    }

    Err(Error::UndeterminedArchiveType {
        folder: folder.to_path_buf(),
    })
}

fn gather_mapping(folder: &Path, tracker: &mut Tracker<'_>) -> Result<Gathered> {
    let lines = read_mapping_file(mapper_path(folder))?;
    tracker.add_total(lines.len() as u64);

    let mut pairs = Vec::with_capacity(lines.len());
    let mut missing = Vec::new();
    for line in &lines {
        tracker.checkpoint()?;
        tracker.start(&line.left, 0);
        let resolved = match resolve_source(folder, &line.right)? {
            SourceRef::Folder(dir) => match gather(&dir, tracker)? {
                Some(Gathered::Bytes(bytes)) => Some(bytes),
                Some(Gathered::Missing(nested)) => {
                    missing.extend(nested.into_iter().map(|r| format!("{}/{r}", line.right)));
                    None
                }
                None => {
                    missing.push(line.right.clone());
                    None
                }
            },
            SourceRef::File(path) | SourceRef::Found(path) => Some(read_file(path)?),
            SourceRef::Unresolved => {
                log::debug!("unresolved reference '{}' in {}", line.right, folder.display());
                missing.push(line.right.clone());
                None
            }
        };
        match resolved {
            Some(bytes) => {
                pairs.push((line.left.as_str(), bytes));
                tracker.finish(&line.left);
            }
            None => tracker.fail(&line.left),
        }
    }

    if !missing.is_empty() {
        return Ok(Gathered::Missing(missing));
    }
    Ok(Gathered::Bytes(build_from_pairs(&pairs)?))
}

fn gather_bundle(
    folder: &Path,
    sources: &[ChunkSource],
    tracker: &mut Tracker<'_>,
) -> Result<Gathered> {
    tracker.add_total(sources.len() as u64);
    let mut chunks = ChunkSet::new();
    let mut missing = Vec::new();
    for (chunk, source) in BundleChunk::ALL.into_iter().zip(sources) {
        tracker.checkpoint()?;
        let name = file_name_lossy(source.path());
        tracker.start(&name, 0);
        let data = match source {
            ChunkSource::File(path) => Some(read_file(path)?),
            ChunkSource::Folder(dir) => match gather(dir, tracker)? {
                Some(Gathered::Bytes(bytes)) => Some(bytes),
                Some(Gathered::Missing(nested)) => {
                    missing.extend(nested.into_iter().map(|r| format!("{name}/{r}")));
                    None
                }
                None => {
                    missing.push(name.clone());
                    None
                }
            },
        };
        match data {
            Some(data) => {
                chunks.set(chunk, data);
                tracker.finish(&name);
            }
            None => tracker.fail(&name),
        }
    }

    if !missing.is_empty() {
        return Ok(Gathered::Missing(missing));
    }
    let tag = read_tag_sidecar(folder)?;
    Ok(Gathered::Bytes(build_bundle(&chunks, tag.as_deref())?))
}

/// Picks one item per canonical extension from the top level of `folder`.
///
/// `<folder name><ext>` wins when it exists; otherwise the first item (by
/// name) whose extension matches, ignoring case. Items may be files or
/// folders.
pub(crate) fn select_bundle_sources(folder: &Path) -> Result<Vec<Option<ChunkSource>>> {
    let base = file_name_lossy(folder);
    let items = list_top_level(folder)?;
    Ok(BundleChunk::ALL
        .into_iter()
        .map(|chunk| {
            let exact = folder.join(format!("{base}{}", chunk.extension()));
            let chosen = if exact.exists() {
                Some(exact)
            } else {
                items
                    .iter()
                    .find(|item| has_chunk_extension(item, chunk))
                    .cloned()
            };
            chosen.map(ChunkSource::from_path)
        })
        .collect())
}

fn has_chunk_extension(path: &Path, chunk: BundleChunk) -> bool {
    let name = file_name_lossy(path);
    split_name(&name).1.eq_ignore_ascii_case(chunk.extension())
}

/// Reads `<folder name>.txt`. An empty sidecar is a marker and carries no tag.
fn read_tag_sidecar(folder: &Path) -> Result<Option<Vec<u8>>> {
    let path = folder.join(format!("{}.txt", file_name_lossy(folder)));
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = read_file(path)?;
    Ok(if bytes.is_empty() { None } else { Some(bytes) })
}

/// Extracts `buf` into `outdir`, recursing into nested containers.
///
/// `label` names the extracted material and should be the name of `outdir`
/// itself: a bundle writes its chunks as `<label>.<ext>` and its tag as
/// `<label>.txt`, which is where [`rebuild_folder`] looks for them. Opaque
/// buffers are written as a single file named after `label`.
///
/// Archive entries get their extension guessed from the payload magic.
/// Bundle chunks do not: they always keep `.sseq`, `.sbnk` or `.swar`, since
/// that extension is how [`rebuild_folder`] finds them again.
///
/// Returns the manifest lines when `buf` is an archive (also written to
/// `outdir/mapper.txt`) and an empty list otherwise.
///
/// Files already written stay on disk when the extraction fails or is
/// cancelled.
pub fn extract_nested(
    buf: &[u8],
    outdir: impl AsRef<Path>,
    label: &str,
    progress: &mut dyn ProgressReporter,
) -> Result<Vec<MappingLine>> {
    let mut session = ExtractSession::new(Tracker::new(progress));
    session.extract(buf, outdir.as_ref(), label)
}

/// State shared by one extraction call tree.
pub(crate) struct ExtractSession<'a> {
    pub(crate) tracker: Tracker<'a>,
    pub(crate) files_written: usize,
}

impl<'a> ExtractSession<'a> {
    pub(crate) fn new(tracker: Tracker<'a>) -> Self {
        Self {
            tracker,
            files_written: 0,
        }
    }

    pub(crate) fn extract(
        &mut self,
        buf: &[u8],
        outdir: &Path,
        label: &str,
    ) -> Result<Vec<MappingLine>> {
        fs::create_dir_all(outdir)?;
        match ArchiveKind::classify(buf) {
            ArchiveKind::Archive => self.extract_archive(buf, outdir),
            ArchiveKind::Bundle => {
                self.extract_bundle(buf, outdir, label)?;
                Ok(Vec::new())
            }
            ArchiveKind::Opaque => {
                self.extract_leaf(buf, outdir, label)?;
                Ok(Vec::new())
            }
        }
    }

    fn extract_archive(&mut self, buf: &[u8], outdir: &Path) -> Result<Vec<MappingLine>> {
        let entries = parse_archive(buf)?;
        let mut counters = NameCounters::new();
        counters.reserve(MAPPER_FILE_NAME);
        self.tracker.add_total(entries.len() as u64);

        let mut lines = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            self.tracker.checkpoint()?;
            self.tracker.start(&entry.name, entry.size);
            let data = payload(entry, buf)?;
            let file_name = entry_file_name(&entry.name, index);
            let (stem, ext) = split_name(&file_name);
            let out_name = match ArchiveKind::classify(data) {
                ArchiveKind::Opaque => {
                    let ext = guess_extension(data, ext);
                    let name = unique_out_name(stem, ext, outdir, &mut counters);
                    self.write(&outdir.join(&name), data)?;
                    name
                }
                kind => {
                    let name = unique_out_name(stem, "", outdir, &mut counters);
                    self.extract_container(data, &outdir.join(&name), &name, kind)?;
                    name
                }
            };
            lines.push(MappingLine::new(entry.name.clone(), out_name));
            self.tracker.finish(&entry.name);
        }

        write_mapping_file(mapper_path(outdir), &lines)?;
        Ok(lines)
    }

    fn extract_bundle(&mut self, buf: &[u8], outdir: &Path, label: &str) -> Result<()> {
        let chunks = parse_bundle(buf, label)?;
        let sidecar = format!("{label}.txt");
        let mut counters = NameCounters::new();
        counters.reserve(sidecar.as_str());
        if let Some(tag) = bundle_tag(buf) {
            write_file(outdir.join(&sidecar), tag)?;
        }
        self.tracker.add_total(chunks.len() as u64);

        for (chunk, entry) in BundleChunk::ALL.into_iter().zip(&chunks) {
            self.tracker.checkpoint()?;
            self.tracker.start(&entry.name, entry.size);
            let data = payload(entry, buf)?;
            // chunks keep their canonical extension so the bundle folder
            // still rebuilds
            let name = unique_out_name(label, chunk.extension(), outdir, &mut counters);
            match ArchiveKind::classify(data) {
                ArchiveKind::Opaque => self.write(&outdir.join(&name), data)?,
                kind => self.extract_container(data, &outdir.join(&name), &name, kind)?,
            }
            self.tracker.finish(&entry.name);
        }
        Ok(())
    }

    fn extract_leaf(&mut self, buf: &[u8], outdir: &Path, label: &str) -> Result<()> {
        self.tracker.checkpoint()?;
        self.tracker.add_total(1);
        self.tracker.start(label, buf.len() as u64);
        let (stem, ext) = split_name(label);
        let name = unique_out_name(stem, ext, outdir, &mut NameCounters::new());
        self.write(&outdir.join(name), buf)?;
        self.tracker.finish(label);
        Ok(())
    }

    /// Extracts a nested container into its own folder and leaves the marker
    /// that selects the matching rebuild branch.
    fn extract_container(
        &mut self,
        data: &[u8],
        folder: &Path,
        label: &str,
        kind: ArchiveKind,
    ) -> Result<()> {
        log::debug!("extracting nested {kind:?} into {}", folder.display());
        self.extract(data, folder, label)?;
        let marker = match kind {
            ArchiveKind::Bundle => folder.join(format!("{label}.txt")),
            _ => mapper_path(folder),
        };
        if !marker.exists() {
            write_file(marker, &[])?;
        }
        Ok(())
    }

    fn write(&mut self, path: &Path, data: &[u8]) -> Result<()> {
        write_file(path, data)?;
        self.files_written += 1;
        Ok(())
    }
}

fn payload<'b>(entry: &Entry, buf: &'b [u8]) -> Result<&'b [u8]> {
    entry.data(buf).ok_or_else(|| {
        Error::corrupt(
            entry.offset,
            format!("'{}' runs past end of buffer", entry.name),
        )
    })
}
