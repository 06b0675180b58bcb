//! Extraction to the file system.

use std::path::{Path, PathBuf};

use crate::bundle::{BundleChunk, bundle_tag, replace_chunk};
use crate::entry::Entry;
use crate::format::MAPPER_FILE_NAME;
use crate::format::detect::{ArchiveType, guess_extension};
use crate::fs::{read_file, write_file};
use crate::mapping::{MappingLine, mapper_path, write_mapping_file};
use crate::naming::{NameCounters, entry_file_name, split_name, unique_out_name};
use crate::progress::{ProgressReporter, Tracker};
use crate::rebuild::ExtractSession;
use crate::{Error, Result};

use super::{ExtractOptions, ExtractResult, LoadedArchive};

impl LoadedArchive {
    /// Extracts every entry into `dest/<archive stem>`.
    ///
    /// Flat mode writes one file per top-level entry, with names from one
    /// shared [`NameCounters`] table. Archives also get a `mapper.txt`;
    /// bundles get their tag as `<stem>.txt`. Nested mode recurses into
    /// embedded containers (see [`extract_nested`](crate::rebuild::extract_nested)).
    ///
    /// Either way the output folder rebuilds to the original archive with
    /// [`rebuild_folder`](crate::rebuild::rebuild_folder).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when `progress` requests it; files
    /// written up to that point are kept.
    pub fn extract_all(
        &self,
        dest: impl AsRef<Path>,
        options: &ExtractOptions,
        progress: &mut dyn ProgressReporter,
    ) -> Result<ExtractResult> {
        let stem = self.stem();
        let out_dir = dest.as_ref().join(&stem);
        std::fs::create_dir_all(&out_dir)?;
        let buf = read_file(&self.path)?;
        let mut session = ExtractSession::new(Tracker::new(progress));

        let mapping_lines = if options.nested {
            session.extract(&buf, &out_dir, &stem)?
        } else {
            match self.archive_type {
                ArchiveType::Archive => {
                    self.extract_flat_archive(&buf, &out_dir, options, &mut session)?
                }
                ArchiveType::Bundle => {
                    self.extract_flat_bundle(&buf, &out_dir, &stem, &mut session)?;
                    Vec::new()
                }
            }
        };

        log::debug!(
            "extracted {} files into {}",
            session.files_written,
            out_dir.display()
        );
        Ok(ExtractResult {
            out_dir,
            mapping_lines,
            files_written: session.files_written,
        })
    }

    fn extract_flat_archive(
        &self,
        buf: &[u8],
        out_dir: &Path,
        options: &ExtractOptions,
        session: &mut ExtractSession<'_>,
    ) -> Result<Vec<MappingLine>> {
        let mut counters = NameCounters::new();
        counters.reserve(MAPPER_FILE_NAME);
        session.tracker.add_total(self.entries.len() as u64);

        let mut lines = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            session.tracker.checkpoint()?;
            session.tracker.start(&entry.name, entry.size);
            let data = entry_payload(entry, buf)?;
            let file_name = entry_file_name(&entry.name, index);
            let (stem, ext) = split_name(&file_name);
            let ext = if options.guess_extensions {
                guess_extension(data, ext)
            } else {
                ext
            };
            let name = unique_out_name(stem, ext, out_dir, &mut counters);
            write_file(out_dir.join(&name), data)?;
            session.files_written += 1;
            lines.push(MappingLine::new(entry.name.clone(), name));
            session.tracker.finish(&entry.name);
        }

        write_mapping_file(mapper_path(out_dir), &lines)?;
        Ok(lines)
    }

    fn extract_flat_bundle(
        &self,
        buf: &[u8],
        out_dir: &Path,
        stem: &str,
        session: &mut ExtractSession<'_>,
    ) -> Result<()> {
        let sidecar = format!("{stem}.txt");
        let mut counters = NameCounters::new();
        counters.reserve(sidecar.as_str());
        if let Some(tag) = bundle_tag(buf) {
            write_file(out_dir.join(&sidecar), tag)?;
        }
        session.tracker.add_total(self.entries.len() as u64);

        for (chunk, entry) in BundleChunk::ALL.into_iter().zip(&self.entries) {
            session.tracker.checkpoint()?;
            session.tracker.start(&entry.name, entry.size);
            let data = entry_payload(entry, buf)?;
            let name = unique_out_name(stem, chunk.extension(), out_dir, &mut counters);
            write_file(out_dir.join(name), data)?;
            session.files_written += 1;
            session.tracker.finish(&entry.name);
        }
        Ok(())
    }

    /// Extracts one top-level entry into `dest`, returning the written path.
    ///
    /// Archive entries get their extension guessed from the payload; bundle
    /// chunks keep their name. An existing file is overwritten.
    pub fn extract_entry(&self, entry: &Entry, dest: impl AsRef<Path>) -> Result<PathBuf> {
        let data = self.read_entry_bytes(entry)?;
        let index = self.entries.iter().position(|e| e == entry).unwrap_or(0);
        let file_name = entry_file_name(&entry.name, index);
        let target = match self.archive_type {
            ArchiveType::Archive => {
                let (stem, ext) = split_name(&file_name);
                dest.as_ref().join(format!("{stem}{}", guess_extension(&data, ext)))
            }
            ArchiveType::Bundle => dest.as_ref().join(file_name),
        };
        write_file(&target, &data)?;
        Ok(target)
    }

    /// Extracts one chunk of a bundle into `dest` under the chunk's name.
    ///
    /// `parent` is the archive entry holding the bundle, or `None` for a
    /// standalone bundle.
    pub fn extract_chunk(
        &self,
        parent: Option<&Entry>,
        chunk: &Entry,
        dest: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let data = self.read_chunk_bytes(parent, chunk)?;
        let target = dest.as_ref().join(entry_file_name(&chunk.name, 0));
        write_file(&target, &data)?;
        Ok(target)
    }

    /// Rebuilds a bundle with one chunk replaced by a file's contents.
    ///
    /// The chunk is identified by its extension. The other chunks and the
    /// tag are kept. When `stage_folder` is given the rebuilt bundle is also
    /// written there under the parent's name (or the archive's file name for
    /// a standalone bundle), ready for a later save. The archive file itself
    /// is never modified.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedChunk`] if `chunk` does not carry a canonical
    /// extension, plus any read or parse failure.
    pub fn replace_chunk(
        &self,
        parent: Option<&Entry>,
        chunk: &Entry,
        replacement_file: impl AsRef<Path>,
        stage_folder: Option<&Path>,
    ) -> Result<Vec<u8>> {
        let bundle = self.bundle_bytes(parent)?;
        let new_data = read_file(replacement_file)?;
        let rebuilt = replace_chunk(&bundle, chunk.extension(), &new_data)?;

        if let Some(folder) = stage_folder {
            let name = match parent {
                Some(parent) => {
                    let index = self.entries.iter().position(|e| e == parent).unwrap_or(0);
                    entry_file_name(&parent.name, index)
                }
                None => self
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        Error::InvalidArgument("archive path has no file name".into())
                    })?,
            };
            let staged = folder.join(&name);
            write_file(&staged, &rebuilt)?;
            log::debug!("staged rebuilt bundle at {}", staged.display());
        }
        Ok(rebuilt)
    }
}

fn entry_payload<'b>(entry: &Entry, buf: &'b [u8]) -> Result<&'b [u8]> {
    entry.data(buf).ok_or_else(|| {
        Error::corrupt(
            entry.offset,
            format!("'{}' runs past end of archive", entry.name),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::build_from_pairs;
    use crate::bundle::{ChunkSet, build_bundle};
    use crate::progress::{NoProgress, StatisticsProgress};
    use crate::rebuild::rebuild_folder;
    use tempfile::TempDir;

    fn sample_bundle(tag: Option<&[u8]>) -> Vec<u8> {
        let mut chunks = ChunkSet::new();
        chunks.set(BundleChunk::Sequence, b"SEQ".to_vec());
        chunks.set(BundleChunk::Bank, b"BANK".to_vec());
        chunks.set(BundleChunk::WaveArchive, b"WAVES".to_vec());
        build_bundle(&chunks, tag).unwrap()
    }

    fn open(dir: &TempDir, name: &str, buf: &[u8]) -> LoadedArchive {
        let path = dir.path().join(name);
        std::fs::write(&path, buf).unwrap();
        LoadedArchive::open_path(path).unwrap()
    }

    #[test]
    fn test_flat_extract_shares_counters() {
        let dir = TempDir::new().unwrap();
        let buf = build_from_pairs(&[
            ("dup.bin", b"one".as_slice()),
            ("dup.bin", b"two".as_slice()),
            ("wave.bin", b"SWAVxxxx".as_slice()),
        ])
        .unwrap();
        let archive = open(&dir, "sound.dat", &buf);
        let out = dir.path().join("out");

        let mut progress = StatisticsProgress::new();
        let result = archive.extract_all(&out, &ExtractOptions::new(), &mut progress).unwrap();
        assert_eq!(result.out_dir, out.join("sound"));
        assert_eq!(result.files_written, 3);
        let rights: Vec<_> = result.mapping_lines.iter().map(|l| l.right.as_str()).collect();
        assert_eq!(rights, ["dup.bin", "dup_2.bin", "wave.swav"]);
        assert_eq!(progress.history.last(), Some(&(3, 3)));

        let rebuilt = rebuild_folder(&result.out_dir, &mut NoProgress).unwrap().unwrap();
        assert_eq!(rebuilt, buf);
    }

    #[test]
    fn test_flat_extract_without_guessing() {
        let dir = TempDir::new().unwrap();
        let buf = build_from_pairs(&[("wave.bin", b"SWAVxxxx".as_slice())]).unwrap();
        let archive = open(&dir, "s.dat", &buf);
        let options = ExtractOptions::new().guess_extensions(false);
        let result = archive.extract_all(dir.path(), &options, &mut NoProgress).unwrap();
        assert_eq!(result.mapping_lines, [MappingLine::new("wave.bin", "wave.bin")]);
    }

    #[test]
    fn test_flat_extract_bundle_roundtrip() {
        let dir = TempDir::new().unwrap();
        let buf = sample_bundle(Some(b"T\0G\x01"));
        let archive = open(&dir, "bgm.msnd", &buf);
        let out = dir.path().join("out");
        let result = archive.extract_all(&out, &ExtractOptions::new(), &mut NoProgress).unwrap();

        assert!(result.mapping_lines.is_empty());
        assert_eq!(read_file(result.out_dir.join("bgm.swar")).unwrap(), b"WAVES");
        assert_eq!(read_file(result.out_dir.join("bgm.txt")).unwrap(), b"T\0G\x01");
        let rebuilt = rebuild_folder(&result.out_dir, &mut NoProgress).unwrap().unwrap();
        assert_eq!(rebuilt, buf);
    }

    #[test]
    fn test_nested_extract_all() {
        let dir = TempDir::new().unwrap();
        let buf = build_from_pairs(&[("bgm.msnd", sample_bundle(None).as_slice())]).unwrap();
        let archive = open(&dir, "sound.dat", &buf);
        let options = ExtractOptions::new().nested(true);
        let result = archive.extract_all(dir.path(), &options, &mut NoProgress).unwrap();

        assert_eq!(result.mapping_lines, [MappingLine::new("bgm.msnd", "bgm")]);
        assert_eq!(result.files_written, 3);
        assert!(result.out_dir.join("bgm/bgm.sseq").is_file());
        let rebuilt = rebuild_folder(&result.out_dir, &mut NoProgress).unwrap().unwrap();
        assert_eq!(rebuilt, buf);
    }

    #[test]
    fn test_extract_entry_and_chunk() {
        let dir = TempDir::new().unwrap();
        let buf = build_from_pairs(&[
            ("voice.bin", b"STRMdata".as_slice()),
            ("bgm.msnd", sample_bundle(None).as_slice()),
        ])
        .unwrap();
        let archive = open(&dir, "sound.dat", &buf);
        let dest = dir.path().join("single");

        let written = archive.extract_entry(&archive.entries()[0], &dest).unwrap();
        assert_eq!(written, dest.join("voice.strm"));

        let bgm = &archive.entries()[1];
        let written = archive.extract_chunk(Some(bgm), &bgm.children[0], &dest).unwrap();
        assert_eq!(written, dest.join("bgm.sseq"));
        assert_eq!(read_file(written).unwrap(), b"SEQ");
    }

    #[test]
    fn test_replace_chunk_stages_bundle() {
        let dir = TempDir::new().unwrap();
        let bundle = sample_bundle(Some(b"ABCD"));
        let buf = build_from_pairs(&[("sub/bgm.msnd", bundle.as_slice())]).unwrap();
        let archive = open(&dir, "sound.dat", &buf);
        let replacement = dir.path().join("new.sbnk");
        std::fs::write(&replacement, b"NEW-BANK").unwrap();
        let stage = dir.path().join("stage");

        let bgm = &archive.entries()[0];
        let rebuilt = archive
            .replace_chunk(Some(bgm), &bgm.children[1], &replacement, Some(&stage))
            .unwrap();

        let chunks = crate::bundle::read_chunks(&rebuilt).unwrap();
        assert_eq!(chunks.get(BundleChunk::Sequence), Some(&b"SEQ"[..]));
        assert_eq!(chunks.get(BundleChunk::Bank), Some(&b"NEW-BANK"[..]));
        assert_eq!(bundle_tag(&rebuilt), Some(&b"ABCD"[..]));
        assert_eq!(read_file(stage.join("sub/bgm.msnd")).unwrap(), rebuilt);
    }

    #[test]
    fn test_replace_chunk_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let archive = open(&dir, "bgm.msnd", &sample_bundle(None));
        let replacement = dir.path().join("x.bin");
        std::fs::write(&replacement, b"x").unwrap();
        let bogus = Entry::file("bgm.wav", 0, 0);
        assert!(matches!(
            archive.replace_chunk(None, &bogus, &replacement, None),
            Err(Error::UnsupportedChunk { .. })
        ));
    }
}
