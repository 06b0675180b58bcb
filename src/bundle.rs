//! DSEQ bundle codec.
//!
//! A bundle is a fixed 48-byte header followed by exactly three chunks in
//! canonical order: sequence (`.sseq`), bank (`.sbnk`) and wave archive
//! (`.swar`). Chunk payloads are opaque.
//!
//! # Header layout
//!
//! | Bytes | Field |
//! |-------|-------|
//! | 0..4 | `DSEQ` |
//! | 16..20 | sequence offset + 16 |
//! | 20..24 | bank offset |
//! | 24..28 | wave archive offset |
//! | 32..36 | sequence size |
//! | 36..40 | bank size |
//! | 40..44 | wave archive size |
//! | 44..48 | optional opaque tag |
//!
//! Every other header byte is zero in bundles produced by [`build_bundle`].
//!
//! # Example
//!
//! ```rust
//! use dsarc::bundle::{BundleChunk, ChunkSet, build_bundle, parse_bundle};
//!
//! # fn main() -> dsarc::Result<()> {
//! let mut chunks = ChunkSet::new();
//! chunks.insert(".sseq", b"SSEQ".to_vec())?;
//! chunks.insert(".sbnk", b"SBNK".to_vec())?;
//! chunks.insert(".swar", b"SWAR".to_vec())?;
//!
//! let buf = build_bundle(&chunks, Some(b"TAG!"))?;
//! let entries = parse_bundle(&buf, "bgm")?;
//! assert_eq!(entries[1].name, "bgm.sbnk");
//! assert_eq!(entries[1].data(&buf), Some(&b"SBNK"[..]));
//! assert_eq!(&buf[44..48], b"TAG!");
//! # Ok(())
//! # }
//! ```

use crate::entry::Entry;
use crate::format::reader::{i32_at, put_i32, wire_len};
use crate::format::{
    BUNDLE_HEADER_SIZE, BUNDLE_SIGNATURE, BUNDLE_TAG_OFFSET, BUNDLE_TAG_SIZE,
    FIRST_CHUNK_OFFSET_BIAS, bundle_field,
};
use crate::{Error, Result};

/// One of the three fixed bundle chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BundleChunk {
    /// The sequence chunk.
    Sequence,
    /// The instrument bank chunk.
    Bank,
    /// The wave archive chunk.
    WaveArchive,
}

impl BundleChunk {
    /// All chunks in canonical order.
    pub const ALL: [BundleChunk; 3] = [
        BundleChunk::Sequence,
        BundleChunk::Bank,
        BundleChunk::WaveArchive,
    ];

    /// The canonical file extension, including the dot.
    pub fn extension(self) -> &'static str {
        match self {
            BundleChunk::Sequence => ".sseq",
            BundleChunk::Bank => ".sbnk",
            BundleChunk::WaveArchive => ".swar",
        }
    }

    /// The chunk label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            BundleChunk::Sequence => "SSEQ",
            BundleChunk::Bank => "SBNK",
            BundleChunk::WaveArchive => "SWAR",
        }
    }

    /// Position in canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Resolves an extension, with or without the leading dot,
    /// case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        Self::ALL
            .into_iter()
            .find(|c| c.extension()[1..].eq_ignore_ascii_case(ext))
    }

    /// Resolves an extension or fails with [`Error::UnsupportedChunk`].
    pub fn parse(ext: &str) -> Result<Self> {
        Self::from_extension(ext).ok_or_else(|| Error::UnsupportedChunk {
            extension: ext.to_string(),
        })
    }

    fn header_fields(self) -> (usize, usize) {
        match self {
            BundleChunk::Sequence => (bundle_field::SEQUENCE_OFFSET, bundle_field::SEQUENCE_SIZE),
            BundleChunk::Bank => (bundle_field::BANK_OFFSET, bundle_field::BANK_SIZE),
            BundleChunk::WaveArchive => (
                bundle_field::WAVE_ARCHIVE_OFFSET,
                bundle_field::WAVE_ARCHIVE_SIZE,
            ),
        }
    }

    fn offset_bias(self) -> i32 {
        match self {
            BundleChunk::Sequence => FIRST_CHUNK_OFFSET_BIAS,
            _ => 0,
        }
    }
}

impl std::fmt::Display for BundleChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Chunk payloads keyed by canonical extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSet {
    chunks: [Option<Vec<u8>>; 3],
}

impl ChunkSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under the chunk named by `ext`, replacing any previous
    /// payload.
    pub fn insert(&mut self, ext: &str, data: Vec<u8>) -> Result<()> {
        let chunk = BundleChunk::parse(ext)?;
        self.set(chunk, data);
        Ok(())
    }

    /// Stores `data` under `chunk`.
    pub fn set(&mut self, chunk: BundleChunk, data: Vec<u8>) {
        self.chunks[chunk.index()] = Some(data);
    }

    /// Returns the payload of `chunk` if present.
    pub fn get(&self, chunk: BundleChunk) -> Option<&[u8]> {
        self.chunks[chunk.index()].as_deref()
    }

    /// Returns `true` when all three chunks are present.
    pub fn is_complete(&self) -> bool {
        self.chunks.iter().all(Option::is_some)
    }

    fn require(&self, chunk: BundleChunk) -> Result<&[u8]> {
        self.get(chunk).ok_or(Error::MissingChunk {
            extension: chunk.extension(),
        })
    }
}

/// Parses a bundle header into its three chunk entries.
///
/// Chunk names are `base_name` followed by the canonical extension. The
/// returned entries never have children.
///
/// # Errors
///
/// - [`Error::CorruptHeader`] if the signature is wrong or the buffer is
///   shorter than the 48-byte header.
/// - [`Error::ChunkOutOfBounds`] naming the first chunk whose declared range
///   is negative or runs past the end of the buffer.
pub fn parse_bundle(buf: &[u8], base_name: &str) -> Result<Vec<Entry>> {
    if buf.len() < BUNDLE_SIGNATURE.len() {
        return Err(Error::corrupt(0, "header too short"));
    }
    if !buf.starts_with(BUNDLE_SIGNATURE) {
        return Err(Error::corrupt(0, "magic mismatch"));
    }
    if buf.len() < BUNDLE_HEADER_SIZE {
        return Err(Error::corrupt(
            buf.len() as u64,
            format!(
                "bundle header too short: {} of {BUNDLE_HEADER_SIZE} bytes",
                buf.len()
            ),
        ));
    }

    let length = buf.len() as u64;
    let mut entries = Vec::with_capacity(BundleChunk::ALL.len());
    for chunk in BundleChunk::ALL {
        let (offset, size) = chunk_range(buf, chunk)?;
        if offset < 0 || size < 0 || offset + size > length as i64 {
            return Err(Error::ChunkOutOfBounds {
                chunk: chunk.label(),
                offset,
                size,
                length,
            });
        }
        entries.push(Entry::file(
            format!("{base_name}{}", chunk.extension()),
            size as u64,
            offset as u64,
        ));
    }
    log::debug!(
        "parsed bundle '{base_name}': {} / {} / {} bytes",
        entries[0].size,
        entries[1].size,
        entries[2].size
    );
    Ok(entries)
}

/// Reads a chunk's declared (offset, size) with the header bias removed.
fn chunk_range(buf: &[u8], chunk: BundleChunk) -> Result<(i64, i64)> {
    let (offset_pos, size_pos) = chunk.header_fields();
    let raw_offset = i32_at(buf, offset_pos)
        .ok_or_else(|| Error::corrupt(offset_pos as u64, "truncated chunk offset"))?;
    let size = i32_at(buf, size_pos)
        .ok_or_else(|| Error::corrupt(size_pos as u64, "truncated chunk size"))?;
    Ok((
        i64::from(raw_offset) - i64::from(chunk.offset_bias()),
        i64::from(size),
    ))
}

/// Builds a bundle from three chunks and an optional 4-byte tag.
///
/// Chunks are laid out contiguously from byte 48 in canonical order. The
/// output depends only on the chunk bytes and the tag.
///
/// # Errors
///
/// - [`Error::MissingChunk`] naming the first absent canonical extension.
/// - [`Error::InvalidTagLength`] if `tag` is given but not exactly 4 bytes.
pub fn build_bundle(chunks: &ChunkSet, tag: Option<&[u8]>) -> Result<Vec<u8>> {
    let payloads = [
        chunks.require(BundleChunk::Sequence)?,
        chunks.require(BundleChunk::Bank)?,
        chunks.require(BundleChunk::WaveArchive)?,
    ];
    if let Some(tag) = tag {
        if tag.len() != BUNDLE_TAG_SIZE {
            return Err(Error::InvalidTagLength { length: tag.len() });
        }
    }

    let total: usize = BUNDLE_HEADER_SIZE + payloads.iter().map(|p| p.len()).sum::<usize>();
    let mut out = vec![0u8; BUNDLE_HEADER_SIZE];
    out.reserve(total - BUNDLE_HEADER_SIZE);
    out[..BUNDLE_SIGNATURE.len()].copy_from_slice(BUNDLE_SIGNATURE);

    let mut cursor = BUNDLE_HEADER_SIZE;
    for (chunk, payload) in BundleChunk::ALL.into_iter().zip(payloads) {
        let (offset_pos, size_pos) = chunk.header_fields();
        let stored_offset = wire_len(cursor)?
            .checked_add(chunk.offset_bias())
            .ok_or_else(|| Error::InvalidArgument("bundle exceeds 2 GiB".into()))?;
        put_i32(&mut out, offset_pos, stored_offset);
        put_i32(&mut out, size_pos, wire_len(payload.len())?);
        cursor += payload.len();
    }
    wire_len(cursor)?;

    if let Some(tag) = tag {
        out[BUNDLE_TAG_OFFSET..BUNDLE_TAG_OFFSET + BUNDLE_TAG_SIZE].copy_from_slice(tag);
    }
    for payload in payloads {
        out.extend_from_slice(payload);
    }
    Ok(out)
}

/// Returns the 4-byte tag of a bundle buffer, if the buffer is long enough.
pub fn bundle_tag(buf: &[u8]) -> Option<&[u8]> {
    buf.get(BUNDLE_TAG_OFFSET..BUNDLE_TAG_OFFSET + BUNDLE_TAG_SIZE)
}

/// Reads all three chunks of a bundle into a [`ChunkSet`].
pub fn read_chunks(buf: &[u8]) -> Result<ChunkSet> {
    let entries = parse_bundle(buf, "")?;
    let mut chunks = ChunkSet::new();
    for (chunk, entry) in BundleChunk::ALL.into_iter().zip(&entries) {
        // parse_bundle has already bounds-checked every range
        let data = entry.data(buf).unwrap_or_default();
        chunks.set(chunk, data.to_vec());
    }
    Ok(chunks)
}

/// Returns a bundle with one chunk replaced.
///
/// The other two chunks and the tag are carried over; the result is laid out
/// canonically, so offsets shift when the new chunk differs in size. The
/// input buffer is never modified.
///
/// # Errors
///
/// Any [`parse_bundle`] failure, or [`Error::UnsupportedChunk`] if
/// `target_ext` is not a canonical extension.
pub fn replace_chunk(buf: &[u8], target_ext: &str, new_data: &[u8]) -> Result<Vec<u8>> {
    let mut chunks = read_chunks(buf)?;
    let target = BundleChunk::parse(target_ext)?;
    log::debug!(
        "replacing {target} chunk: {} -> {} bytes",
        chunks.get(target).map_or(0, <[u8]>::len),
        new_data.len()
    );
    chunks.set(target, new_data.to_vec());
    build_bundle(&chunks, bundle_tag(buf))
}
