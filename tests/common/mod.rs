//! Shared test utilities for integration tests.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dsarc::archive::build_from_pairs;
use dsarc::bundle::{ChunkSet, build_bundle};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Builds a bundle from three chunk payloads and an optional tag.
pub fn create_bundle(seq: &[u8], bank: &[u8], war: &[u8], tag: Option<&[u8; 4]>) -> Vec<u8> {
    let mut chunks = ChunkSet::new();
    chunks.insert(".sseq", seq.to_vec()).unwrap();
    chunks.insert(".sbnk", bank.to_vec()).unwrap();
    chunks.insert(".swar", war.to_vec()).unwrap();
    build_bundle(&chunks, tag.map(|t| t.as_slice())).unwrap()
}

/// Builds an archive from (name, payload) pairs.
pub fn create_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    build_from_pairs(entries).unwrap()
}

/// An archive with a plain file, an embedded bundle and a SWAV payload.
pub fn sample_archive() -> Vec<u8> {
    let bundle = create_bundle(b"seq-data", b"bank-data", b"wave-data", Some(b"TAG1"));
    create_archive(&[
        ("readme.bin", b"plain payload".as_slice()),
        ("bgm.msnd", bundle.as_slice()),
        ("voice.bin", b"SWAV\x01\x02\x03".as_slice()),
    ])
}

/// A three-level tree: archive -> bundle -> archive in the `.swar` chunk.
pub fn nested_archive() -> Vec<u8> {
    let inner = create_archive(&[
        ("w0.bin", b"wave zero".as_slice()),
        ("w1.bin", b"STRMwave one".as_slice()),
    ]);
    let bundle = create_bundle(b"seq", b"bank", &inner, Some(b"NEST"));
    create_archive(&[
        ("top.bin", b"top level".as_slice()),
        ("music.msnd", bundle.as_slice()),
    ])
}

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_temp_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Creates a temp dir holding one container file.
pub fn create_archive_file(name: &str, bytes: &[u8]) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_temp_file(temp_dir.path(), name, bytes);
    (temp_dir, path)
}

/// Reads every file under `root` keyed by forward-slash relative path.
pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            (rel, std::fs::read(e.path()).unwrap())
        })
        .collect()
}

/// Helper to extract an error from a Result, panicking if Ok.
pub fn expect_err<T, E>(result: Result<T, E>) -> E {
    match result {
        Ok(_) => panic!("Expected error but got Ok"),
        Err(e) => e,
    }
}
