//! CLI command integration tests.
//!
//! These tests verify the core functionality that CLI commands would use.
//! Tests use library functions directly rather than subprocess execution.

use dsarc::bundle::BundleChunk;
use dsarc::format::detect::detect_bytes;
use dsarc::{
    ArchiveType, AtomicProgress, Error, ExtractOptions, LoadedArchive, NoProgress,
    StatisticsProgress, inspect_folder, rebuild_folder, save_archive,
};

mod common;

use common::{create_archive, create_archive_file, create_bundle, read_tree, sample_archive};

// =============================================================================
// List Command Tests
// =============================================================================

#[test]
fn test_list_basic() {
    let (_dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();

    assert_eq!(archive.archive_type(), ArchiveType::Archive);
    let names: Vec<&str> = archive.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["readme.bin", "bgm.msnd", "voice.bin"]);

    let bgm = archive.entry("bgm.msnd").unwrap();
    let chunks: Vec<&str> = bgm.children.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(chunks, ["bgm.sseq", "bgm.sbnk", "bgm.swar"]);
}

#[test]
fn test_list_empty_archive() {
    let (_dir, path) = create_archive_file("empty.dat", &create_archive(&[]));
    let archive = LoadedArchive::open_path(&path).unwrap();
    assert!(archive.entries().is_empty());
}

#[test]
fn test_list_standalone_bundle() {
    let bundle = create_bundle(b"s", b"bb", b"www", None);
    let (_dir, path) = create_archive_file("jingle.msnd", &bundle);
    let archive = LoadedArchive::open_path(&path).unwrap();
    assert_eq!(archive.archive_type(), ArchiveType::Bundle);
    let sizes: Vec<u64> = archive.entries().iter().map(|e| e.size).collect();
    assert_eq!(sizes, [1, 2, 3]);
    assert_eq!(archive.entries()[2].name, "jingle.swar");
}

// =============================================================================
// Info Command Tests
// =============================================================================

#[test]
fn test_info_counts() {
    let (_dir, path) = create_archive_file("sound.dat", &sample_archive());
    let info = LoadedArchive::open_path(&path).unwrap().info().unwrap();

    assert_eq!(info.archive_type, ArchiveType::Archive);
    assert_eq!(info.entry_count, 3);
    assert_eq!(info.bundle_count, 1);
    // 13 + (48 + 8 + 9 + 9) + 7
    assert_eq!(info.payload_size, 94);
    assert_eq!(info.file_size, 16 + 3 * 48 + 94);
    assert_eq!(info.overhead(), 160);
}

// =============================================================================
// Extract Command Tests
// =============================================================================

#[test]
fn test_extract_without_guessing() {
    let (dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();

    let options = ExtractOptions::new().guess_extensions(false);
    let result = archive
        .extract_all(dir.path().join("out"), &options, &mut NoProgress)
        .unwrap();

    let tree = read_tree(&result.out_dir);
    assert_eq!(tree["voice.bin"], b"SWAV\x01\x02\x03");
    assert!(!tree.contains_key("voice.swav"));
    assert_eq!(
        rebuild_folder(&result.out_dir, &mut NoProgress).unwrap().unwrap(),
        sample_archive()
    );
}

#[test]
fn test_extract_reports_progress() {
    let (dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();

    let mut progress = StatisticsProgress::new();
    let result = archive
        .extract_all(dir.path(), &ExtractOptions::new(), &mut progress)
        .unwrap();
    assert_eq!(result.files_written, 3);
    assert_eq!(progress.history.last(), Some(&(3, 3)));
}

#[test]
fn test_extract_cancelled() {
    let (dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();

    let mut progress = AtomicProgress::new();
    progress.cancel();
    let err = archive
        .extract_all(dir.path(), &ExtractOptions::new(), &mut progress)
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn test_extract_single_entry_guesses_extension() {
    let (dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();
    let voice = archive.entry("voice.bin").unwrap();

    let written = archive.extract_entry(voice, dir.path()).unwrap();
    assert_eq!(written, dir.path().join("voice.swav"));
}

// =============================================================================
// Rebuild / Save Command Tests
// =============================================================================

#[test]
fn test_rebuild_output_type_is_detectable() {
    let (dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();
    let result = archive
        .extract_all(dir.path(), &ExtractOptions::new().nested(true), &mut NoProgress)
        .unwrap();

    let rebuilt = rebuild_folder(&result.out_dir, &mut NoProgress)
        .unwrap()
        .unwrap();
    assert_eq!(detect_bytes(&rebuilt).unwrap(), ArchiveType::Archive);

    let bgm = rebuild_folder(result.out_dir.join("bgm"), &mut NoProgress)
        .unwrap()
        .unwrap();
    assert_eq!(detect_bytes(&bgm).unwrap(), ArchiveType::Bundle);
}

#[test]
fn test_inspect_then_save_matches_rebuild_layout() {
    let (dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();
    let result = archive
        .extract_all(dir.path(), &ExtractOptions::new(), &mut NoProgress)
        .unwrap();

    let import = inspect_folder(&result.out_dir, &mut NoProgress).unwrap();
    assert_eq!(import.file_type, ArchiveType::Archive);

    let target = dir.path().join("saved.dat");
    let saved = save_archive(
        &target,
        import.file_type,
        &import.entries,
        &import.source_folder,
        &mut NoProgress,
    )
    .unwrap();
    assert_eq!(saved.entries_written, import.entries.len());
    assert_eq!(
        LoadedArchive::open_path(&target).unwrap().entries().len(),
        import.entries.len()
    );
}

// =============================================================================
// Replace-Chunk Command Tests
// =============================================================================

#[test]
fn test_replace_chunk_selected_by_extension() {
    let (dir, path) = create_archive_file("sound.dat", &sample_archive());
    let archive = LoadedArchive::open_path(&path).unwrap();
    let parent = archive.entry("bgm.msnd").unwrap();

    let wanted = BundleChunk::from_extension("swar").unwrap();
    let chunk = &parent.children[wanted.index()];
    assert_eq!(chunk.name, "bgm.swar");

    let replacement = common::write_temp_file(dir.path(), "new.swar", b"new waves");
    let bundle = archive
        .replace_chunk(Some(parent), chunk, &replacement, None)
        .unwrap();
    let rebuilt = archive.with_entry_bytes(parent, &bundle).unwrap();

    let out = dir.path().join("edited.dat");
    std::fs::write(&out, &rebuilt).unwrap();
    let edited = LoadedArchive::open_path(&out).unwrap();
    let bgm = edited.entry("bgm.msnd").unwrap();
    let bytes = edited.read_chunk_bytes(Some(bgm), &bgm.children[2]).unwrap();
    assert_eq!(bytes, b"new waves");
}
