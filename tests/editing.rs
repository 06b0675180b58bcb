//! Integration tests for chunk and entry replacement.
//!
//! These tests verify that editing operations:
//! - Replace exactly one chunk or entry and carry everything else over
//! - Preserve the bundle tag
//! - Stage rebuilt bundles where asked
//! - Return correct error types for invalid operations

mod common;

use dsarc::archive::parse_archive;
use dsarc::bundle::{bundle_tag, parse_bundle, replace_chunk};
use dsarc::{Error, LoadedArchive};
use tempfile::TempDir;

use common::{
    create_archive, create_archive_file, create_bundle, expect_err, sample_archive, write_temp_file,
};

// ============================================================================
// In-memory chunk replacement
// ============================================================================

#[test]
fn test_replace_each_chunk() {
    let original = create_bundle(b"seq", b"bank", b"wave", Some(b"TAGX"));
    for (ext, index) in [(".sseq", 0), (".sbnk", 1), (".swar", 2)] {
        let replaced = replace_chunk(&original, ext, b"a much longer payload").unwrap();
        let before = parse_bundle(&original, "x").unwrap();
        let after = parse_bundle(&replaced, "x").unwrap();

        for i in 0..3 {
            let data = after[i].data(&replaced).unwrap();
            if i == index {
                assert_eq!(data, b"a much longer payload");
            } else {
                assert_eq!(data, before[i].data(&original).unwrap());
            }
        }
        assert_eq!(bundle_tag(&replaced), Some(&b"TAGX"[..]));
    }
}

#[test]
fn test_replace_is_case_insensitive() {
    let original = create_bundle(b"seq", b"bank", b"wave", None);
    let replaced = replace_chunk(&original, "SWAR", b"new").unwrap();
    let chunks = parse_bundle(&replaced, "x").unwrap();
    assert_eq!(chunks[2].data(&replaced), Some(&b"new"[..]));
}

#[test]
fn test_replace_with_same_bytes_is_identity() {
    let original = create_bundle(b"seq", b"bank", b"wave", Some(b"1234"));
    assert_eq!(replace_chunk(&original, ".sbnk", b"bank").unwrap(), original);
}

#[test]
fn test_replace_unknown_extension() {
    let original = create_bundle(b"seq", b"bank", b"wave", None);
    match expect_err(replace_chunk(&original, ".swav", b"x")) {
        Error::UnsupportedChunk { extension } => assert_eq!(extension, ".swav"),
        other => panic!("unexpected error {other:?}"),
    }
}

// ============================================================================
// Replacement through a loaded archive
// ============================================================================

#[test]
fn test_replace_chunk_inside_archive() {
    let (dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();
    let parent = archive.entry("bgm.msnd").unwrap();
    let chunk = parent.child("bgm.sbnk").unwrap();
    let replacement = write_temp_file(dir.path(), "new.sbnk", b"replacement bank");

    let stage = dir.path().join("stage");
    let bundle = archive
        .replace_chunk(Some(parent), chunk, &replacement, Some(&stage))
        .unwrap();
    assert_eq!(std::fs::read(stage.join("bgm.msnd")).unwrap(), bundle);

    let rebuilt = archive.with_entry_bytes(parent, &bundle).unwrap();
    let entries = parse_archive(&rebuilt).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["readme.bin", "bgm.msnd", "voice.bin"]);
    assert_eq!(entries[0].data(&rebuilt), Some(&b"plain payload"[..]));
    assert_eq!(entries[2].data(&rebuilt), Some(&b"SWAV\x01\x02\x03"[..]));

    let bgm = &entries[1];
    assert!(bgm.is_bundle);
    let bundle_bytes = bgm.data(&rebuilt).unwrap();
    assert_eq!(bgm.children[1].data(bundle_bytes), Some(&b"replacement bank"[..]));
    assert_eq!(bgm.children[0].data(bundle_bytes), Some(&b"seq-data"[..]));
    assert_eq!(bundle_tag(bundle_bytes), Some(&b"TAG1"[..]));
}

#[test]
fn test_replace_chunk_in_standalone_bundle() {
    let original = create_bundle(b"seq", b"bank", b"wave", Some(b"SOLO"));
    let (dir, path) = create_archive_file("solo.msnd", &original);
    let archive = LoadedArchive::open_path(&path).unwrap();
    let chunk = &archive.entries()[0];
    assert_eq!(chunk.name, "solo.sseq");
    let replacement = write_temp_file(dir.path(), "x.bin", b"fresh sequence");

    let stage = dir.path().join("stage");
    let bundle = archive
        .replace_chunk(None, chunk, &replacement, Some(&stage))
        .unwrap();
    assert!(stage.join("solo.msnd").is_file());
    assert_eq!(archive.read_chunk_bytes(None, chunk).unwrap(), b"seq");
    assert_eq!(parse_bundle(&bundle, "solo").unwrap()[0].size, 14);
}

#[test]
fn test_replace_chunk_stages_under_last_component() {
    let bundle = create_bundle(b"seq", b"bank", b"wave", None);
    let buf = create_archive(&[("../escaped.msnd", bundle.as_slice())]);
    let (dir, path) = create_archive_file("sound.dat", &buf);
    let archive = LoadedArchive::open_path(&path).unwrap();
    let parent = &archive.entries()[0];
    assert!(parent.is_bundle);
    let replacement = write_temp_file(dir.path(), "new.sseq", b"fresh");

    let stage = dir.path().join("work/stage");
    archive
        .replace_chunk(Some(parent), &parent.children[0], &replacement, Some(&stage))
        .unwrap();
    assert!(stage.join("escaped.msnd").is_file());
    assert!(!dir.path().join("work/escaped.msnd").exists());
}

#[test]
fn test_replace_leaves_source_untouched() {
    let original = sample_archive();
    let (dir, path) = create_archive_file("sound.dat", &original);
    let archive = LoadedArchive::open_path(&path).unwrap();
    let parent = archive.entry("bgm.msnd").unwrap();
    let replacement = write_temp_file(dir.path(), "w.bin", b"w");

    archive
        .replace_chunk(Some(parent), &parent.children[2], &replacement, None)
        .unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), original);
}

#[test]
fn test_replace_requires_bundle_parent() {
    let (dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();
    let plain = archive.entry("readme.bin").unwrap();
    let replacement = write_temp_file(dir.path(), "r.bin", b"r");

    let err = expect_err(archive.replace_chunk(Some(plain), plain, &replacement, None));
    assert!(matches!(err, Error::InvalidArgument(_)));

    let bgm = archive.entry("bgm.msnd").unwrap();
    let err = expect_err(archive.replace_chunk(None, &bgm.children[0], &replacement, None));
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_replace_missing_replacement_file() {
    let (dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();
    let parent = archive.entry("bgm.msnd").unwrap();
    let err = expect_err(archive.replace_chunk(
        Some(parent),
        &parent.children[0],
        dir.path().join("absent.bin"),
        None,
    ));
    assert!(matches!(err, Error::Io(_)));
}

// ============================================================================
// Entry replacement
// ============================================================================

#[test]
fn test_with_entry_bytes_keeps_order() {
    let original = create_archive(&[
        ("a.bin", b"aaa".as_slice()),
        ("b.bin", b"bbb".as_slice()),
        ("c.bin", b"ccc".as_slice()),
    ]);
    let (_dir, path) = create_archive_file("abc.dat", &original);
    let archive = LoadedArchive::open_path(&path).unwrap();
    let target = archive.entry("b.bin").unwrap();

    let rebuilt = archive.with_entry_bytes(target, b"").unwrap();
    let entries = parse_archive(&rebuilt).unwrap();
    assert_eq!(entries[1].size, 0);
    assert_eq!(entries[2].data(&rebuilt), Some(&b"ccc"[..]));

    let restored = archive.with_entry_bytes(target, b"bbb").unwrap();
    assert_eq!(restored, original);
}

#[test]
fn test_with_entry_bytes_rejects_bundle() {
    let (_dir, path) = create_archive_file("b.msnd", &create_bundle(b"s", b"b", b"w", None));
    let archive = LoadedArchive::open_path(&path).unwrap();
    let chunk = archive.entries()[0].clone();
    let err = expect_err(archive.with_entry_bytes(&chunk, b"x"));
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_extract_chunk_to_folder() {
    let (dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();
    let parent = archive.entry("bgm.msnd").unwrap();
    let out = TempDir::new_in(dir.path()).unwrap();

    let written = archive
        .extract_chunk(Some(parent), &parent.children[2], out.path())
        .unwrap();
    assert_eq!(written.file_name().unwrap(), "bgm.swar");
    assert_eq!(std::fs::read(written).unwrap(), b"wave-data");
}
