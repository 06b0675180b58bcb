//! DSARC archive codec.
//!
//! # Layout
//!
//! ```text
//! +--------------------+  0
//! | "DSARC FL"         |
//! | count   (i32 LE)   |  8
//! | version (i32 LE)   | 12
//! +--------------------+ 16
//! | name[40] size off  |  count records of 48 bytes
//! | ...                |
//! +--------------------+ 16 + count * 48
//! | payloads           |
//! +--------------------+
//! ```
//!
//! Entry offsets are absolute. Names are UTF-8, zero padded, and silently
//! truncated to 40 bytes by [`build_from_pairs`].
//!
//! Entries whose payload starts with the DSEQ signature are parsed eagerly
//! as bundles and come back with their three chunks as children.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::bundle::parse_bundle;
use crate::entry::Entry;
use crate::format::reader::{put_i32, read_up_to, wire_len};
use crate::format::{
    ARCHIVE_HEADER_SIZE, ARCHIVE_RECORD_SIZE, ARCHIVE_SIGNATURE, ARCHIVE_VERSION,
    BUNDLE_SIGNATURE, NAME_SIZE,
};
use crate::naming::split_name;
use crate::{Error, Result};

/// A decoded entry record before payload inspection.
#[derive(Debug, Clone)]
struct Record {
    name: String,
    size: i32,
    offset: i32,
}

/// Encodes a name into the fixed 40-byte field.
///
/// The UTF-8 bytes are truncated to 40 and zero padded. Truncation may split
/// a multi-byte character; such names do not round-trip.
///
/// ```rust
/// use dsarc::archive::pad_name;
///
/// let field = pad_name("bgm.msnd");
/// assert_eq!(&field[..8], b"bgm.msnd");
/// assert!(field[8..].iter().all(|&b| b == 0));
/// assert_eq!(pad_name(&"x".repeat(50)), [b'x'; 40]);
/// ```
pub fn pad_name(name: &str) -> [u8; NAME_SIZE] {
    let mut field = [0u8; NAME_SIZE];
    let bytes = name.as_bytes();
    let n = bytes.len().min(NAME_SIZE);
    field[..n].copy_from_slice(&bytes[..n]);
    field
}

/// Decodes a 40-byte name field.
///
/// Reads up to the first NUL, decodes lossily and trims trailing whitespace.
/// An empty result becomes `file_<index>`.
pub fn decode_name(field: &[u8], index: usize) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let name = String::from_utf8_lossy(&field[..end]);
    let name = name.trim_end();
    if name.is_empty() {
        format!("file_{index}")
    } else {
        name.to_string()
    }
}

/// Parses an archive held in memory.
///
/// ```rust
/// use dsarc::archive::{build_from_pairs, parse_archive};
///
/// # fn main() -> dsarc::Result<()> {
/// let buf = build_from_pairs(&[("a.bin", b"hello".as_slice()), ("b.bin", b"!".as_slice())])?;
/// let entries = parse_archive(&buf)?;
/// assert_eq!(entries[0].name, "a.bin");
/// assert_eq!(entries[0].data(&buf), Some(&b"hello"[..]));
/// # Ok(())
/// # }
/// ```
pub fn parse_archive(buf: &[u8]) -> Result<Vec<Entry>> {
    parse_archive_reader(&mut Cursor::new(buf))
}

/// Parses an archive file.
pub fn parse_archive_path(path: impl AsRef<Path>) -> Result<Vec<Entry>> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    parse_archive_reader(&mut reader)
}

/// Parses an archive from a seekable reader.
///
/// The reader may be positioned anywhere; the archive is assumed to start
/// at offset 0 and end at the end of the stream.
///
/// # Errors
///
/// - [`Error::CorruptHeader`] for a short header, a signature mismatch, a
///   negative entry count or an entry table that runs past the end.
/// - [`Error::UnsupportedVersion`] for any version other than 1. No entry
///   record is read in that case.
/// - [`Error::EntryOutOfBounds`] for the first entry whose range is negative
///   or exceeds the archive length.
/// - Any bundle parse error for an entry that starts with `DSEQ`.
pub fn parse_archive_reader<R: Read + Seek>(reader: &mut R) -> Result<Vec<Entry>> {
    let length = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let mut header = [0u8; ARCHIVE_HEADER_SIZE];
    let n = read_up_to(reader, &mut header)?;
    if n < ARCHIVE_SIGNATURE.len() {
        return Err(Error::corrupt(0, "header too short"));
    }
    if !header.starts_with(ARCHIVE_SIGNATURE) {
        return Err(Error::corrupt(0, "magic mismatch"));
    }
    if n < ARCHIVE_HEADER_SIZE {
        return Err(Error::corrupt(n as u64, "header too short"));
    }

    let count = i32::from_le_bytes([header[8], header[9], header[10], header[11]]);
    let version = i32::from_le_bytes([header[12], header[13], header[14], header[15]]);
    if version != ARCHIVE_VERSION {
        return Err(Error::UnsupportedVersion { version });
    }
    if count < 0 {
        return Err(Error::corrupt(8, format!("negative entry count {count}")));
    }

    let count = count as usize;
    let table_len = count as u64 * ARCHIVE_RECORD_SIZE as u64;
    if ARCHIVE_HEADER_SIZE as u64 + table_len > length {
        return Err(Error::corrupt(
            ARCHIVE_HEADER_SIZE as u64,
            format!("entry table of {count} records exceeds archive length {length}"),
        ));
    }

    let mut table = vec![0u8; table_len as usize];
    reader.read_exact(&mut table)?;
    let records = table
        .chunks_exact(ARCHIVE_RECORD_SIZE)
        .enumerate()
        .map(|(index, raw)| decode_record(raw, index, length))
        .collect::<Result<Vec<_>>>()?;

    let mut entries = Vec::with_capacity(records.len());
    for record in records {
        entries.push(inspect_payload(reader, record)?);
    }
    log::debug!("parsed archive: {} entries, {length} bytes", entries.len());
    Ok(entries)
}

fn decode_record(raw: &[u8], index: usize, length: u64) -> Result<Record> {
    let name = decode_name(&raw[..NAME_SIZE], index);
    let size = i32::from_le_bytes([raw[40], raw[41], raw[42], raw[43]]);
    let offset = i32::from_le_bytes([raw[44], raw[45], raw[46], raw[47]]);
    let end = i64::from(offset) + i64::from(size);
    if offset < 0 || size < 0 || end > length as i64 {
        return Err(Error::EntryOutOfBounds {
            index,
            name,
            offset: i64::from(offset),
            size: i64::from(size),
            length,
        });
    }
    Ok(Record { name, size, offset })
}

/// Turns a validated record into an entry, parsing embedded bundles.
///
/// Only the entry's own range is inspected: an entry declared shorter than
/// the bundle it holds yields a truncated bundle buffer.
fn inspect_payload<R: Read + Seek>(reader: &mut R, record: Record) -> Result<Entry> {
    let size = record.size as u64;
    let offset = record.offset as u64;
    if size < BUNDLE_SIGNATURE.len() as u64 {
        return Ok(Entry::file(record.name, size, offset));
    }

    reader.seek(SeekFrom::Start(offset))?;
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != BUNDLE_SIGNATURE {
        return Ok(Entry::file(record.name, size, offset));
    }

    reader.seek(SeekFrom::Start(offset))?;
    let mut payload = vec![0u8; record.size as usize];
    reader.read_exact(&mut payload)?;
    let base = split_name(crate::naming::last_component(&record.name)).0;
    let children = parse_bundle(&payload, base)?;
    log::debug!(
        "entry '{}' holds an embedded bundle ({size} bytes)",
        record.name
    );
    Ok(Entry::bundle(record.name, size, offset, children))
}

/// Builds an archive from ordered (name, payload) pairs.
///
/// The output preserves the pair order exactly. Offsets are assigned
/// cumulatively from `16 + count * 48`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if the archive would not fit the
/// 32-bit offset fields.
pub fn build_from_pairs<N, D>(pairs: &[(N, D)]) -> Result<Vec<u8>>
where
    N: AsRef<str>,
    D: AsRef<[u8]>,
{
    let data_start = ARCHIVE_HEADER_SIZE + pairs.len() * ARCHIVE_RECORD_SIZE;
    let payload_len: usize = pairs.iter().map(|(_, d)| d.as_ref().len()).sum();
    wire_len(data_start + payload_len)?;

    let mut out = Vec::with_capacity(data_start + payload_len);
    out.extend_from_slice(ARCHIVE_SIGNATURE);
    out.extend_from_slice(&wire_len(pairs.len())?.to_le_bytes());
    out.extend_from_slice(&ARCHIVE_VERSION.to_le_bytes());

    let mut offset = data_start;
    for (name, data) in pairs {
        let mut record = [0u8; ARCHIVE_RECORD_SIZE];
        record[..NAME_SIZE].copy_from_slice(&pad_name(name.as_ref()));
        put_i32(&mut record, NAME_SIZE, wire_len(data.as_ref().len())?);
        put_i32(&mut record, NAME_SIZE + 4, wire_len(offset)?);
        out.extend_from_slice(&record);
        offset += data.as_ref().len();
    }
    for (_, data) in pairs {
        out.extend_from_slice(data.as_ref());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{ChunkSet, build_bundle};

    fn bundle_bytes() -> Vec<u8> {
        let mut chunks = ChunkSet::new();
        chunks.insert(".sseq", b"seq".to_vec()).unwrap();
        chunks.insert(".sbnk", b"bank".to_vec()).unwrap();
        chunks.insert(".swar", b"waves".to_vec()).unwrap();
        build_bundle(&chunks, None).unwrap()
    }

    #[test]
    fn test_empty_archive() {
        let buf = build_from_pairs::<&str, &[u8]>(&[]).unwrap();
        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[..8], b"DSARC FL");
        assert_eq!(&buf[8..12], &0i32.to_le_bytes());
        assert_eq!(&buf[12..16], &1i32.to_le_bytes());
        assert!(parse_archive(&buf).unwrap().is_empty());
    }

    #[test]
    fn test_build_layout() {
        let buf = build_from_pairs(&[("a", vec![1u8, 2]), ("b", vec![3u8])]).unwrap();
        assert_eq!(buf.len(), 16 + 2 * 48 + 3);
        // second record offset follows the first payload
        assert_eq!(&buf[16 + 48 + 44..16 + 48 + 48], &(16 + 96 + 2i32).to_le_bytes());
        assert_eq!(&buf[112..], &[1, 2, 3]);
    }

    #[test]
    fn test_parse_preserves_order() {
        let pairs = vec![
            ("z.bin".to_string(), b"zz".to_vec()),
            ("a.bin".to_string(), b"a".to_vec()),
            ("m.bin".to_string(), Vec::new()),
        ];
        let buf = build_from_pairs(&pairs).unwrap();
        let entries = parse_archive(&buf).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["z.bin", "a.bin", "m.bin"]);
        assert_eq!(entries[2].size, 0);
        for (entry, (_, data)) in entries.iter().zip(&pairs) {
            assert_eq!(entry.data(&buf), Some(data.as_slice()));
        }
    }

    #[test]
    fn test_unsupported_version() {
        let mut buf = build_from_pairs(&[("a", b"x")]).unwrap();
        buf[12] = 2;
        // a corrupt table must not be reached
        buf[8] = 0xFF;
        let err = parse_archive(&buf).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version: 2 }));
        assert!(err.is_corruption());
    }

    #[test]
    fn test_magic_mismatch() {
        let err = parse_archive(b"NOTDSARC\0\0\0\0\x01\0\0\0").unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { offset: 0, .. }));
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            parse_archive(b"DSARC FL\x01\0"),
            Err(Error::CorruptHeader { .. })
        ));
        assert!(matches!(parse_archive(b""), Err(Error::CorruptHeader { .. })));
    }

    #[test]
    fn test_table_exceeds_length() {
        let mut buf = build_from_pairs(&[("a", b"x")]).unwrap();
        buf[8] = 200;
        assert!(matches!(
            parse_archive(&buf),
            Err(Error::CorruptHeader { offset: 16, .. })
        ));
    }

    #[test]
    fn test_negative_count() {
        let mut buf = build_from_pairs::<&str, &[u8]>(&[]).unwrap();
        buf[8..12].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(parse_archive(&buf), Err(Error::CorruptHeader { .. })));
    }

    #[test]
    fn test_entry_out_of_bounds() {
        let mut buf =
            build_from_pairs(&[("ok", b"1234".as_slice()), ("bad", b"5678".as_slice())]).unwrap();
        let size_pos = 16 + 48 + 40;
        buf[size_pos..size_pos + 4].copy_from_slice(&100i32.to_le_bytes());
        let err = parse_archive(&buf).unwrap_err();
        assert_eq!(err.entry_index(), Some(1));
        assert!(matches!(err, Error::EntryOutOfBounds { ref name, .. } if name == "bad"));
    }

    #[test]
    fn test_negative_offset() {
        let mut buf = build_from_pairs(&[("a", b"1234")]).unwrap();
        buf[16 + 44..16 + 48].copy_from_slice(&(-4i32).to_le_bytes());
        assert!(matches!(
            parse_archive(&buf),
            Err(Error::EntryOutOfBounds { offset: -4, .. })
        ));
    }

    #[test]
    fn test_synthetic_names() {
        let buf = build_from_pairs(&[("", b"a".as_slice()), ("   ", b"b".as_slice())]).unwrap();
        let entries = parse_archive(&buf).unwrap();
        assert_eq!(entries[0].name, "file_0");
        assert_eq!(entries[1].name, "file_1");
    }

    #[test]
    fn test_long_name_truncated() {
        let long = "n".repeat(45);
        let buf = build_from_pairs(&[(long.as_str(), b"x")]).unwrap();
        let entries = parse_archive(&buf).unwrap();
        assert_eq!(entries[0].name, "n".repeat(40));
    }

    #[test]
    fn test_decode_name_stops_at_nul() {
        let mut field = [0u8; 40];
        field[..5].copy_from_slice(b"ab\0cd");
        assert_eq!(decode_name(&field, 0), "ab");
        let spaced = pad_name("name.bin  ");
        assert_eq!(decode_name(&spaced, 3), "name.bin");
    }

    #[test]
    fn test_embedded_bundle() {
        let bundle = bundle_bytes();
        let buf = build_from_pairs(&[
            ("plain.bin", b"DSE".to_vec()),
            ("music/bgm_00.msnd", bundle.clone()),
        ])
        .unwrap();
        let entries = parse_archive(&buf).unwrap();
        assert!(!entries[0].is_bundle);
        let e = &entries[1];
        assert!(e.is_bundle);
        let names: Vec<_> = e.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["bgm_00.sseq", "bgm_00.sbnk", "bgm_00.swar"]);
        // chunk offsets are relative to the bundle
        let payload = e.data(&buf).unwrap();
        assert_eq!(payload, bundle.as_slice());
        assert_eq!(e.children[2].data(payload), Some(&b"waves"[..]));
    }

    #[test]
    fn test_embedded_bundle_truncated_by_entry_size() {
        // An entry declared smaller than its bundle cuts the bundle short.
        let bundle = bundle_bytes();
        let mut buf = build_from_pairs(&[("x.msnd", bundle.clone())]).unwrap();
        let short = (bundle.len() - 2) as i32;
        buf[16 + 40..16 + 44].copy_from_slice(&short.to_le_bytes());
        let err = parse_archive(&buf).unwrap_err();
        assert!(matches!(err, Error::ChunkOutOfBounds { chunk: "SWAR", .. }));
    }

    #[test]
    fn test_corrupt_embedded_bundle_propagates() {
        let buf = build_from_pairs(&[("x.msnd", b"DSEQ-but-short".to_vec())]).unwrap();
        assert!(matches!(
            parse_archive(&buf),
            Err(Error::CorruptHeader { .. })
        ));
    }

    #[test]
    fn test_parse_archive_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.dat");
        let buf = build_from_pairs(&[("a.bin", b"abc")]).unwrap();
        std::fs::write(&path, &buf).unwrap();
        let entries = parse_archive_path(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].offset, 64);
    }
}
