//! Wire-format constants and low-level parsing utilities.
//!
//! Two container formats are understood:
//!
//! - **DSARC** (`DSARC FL`): a flat archive of named entries with a fixed
//!   16-byte header and 48-byte entry records.
//! - **DSEQ**: a sound bundle with a fixed 48-byte header followed by exactly
//!   three chunks (sequence, bank, wave archive).
//!
//! All integers are little-endian `i32`.

pub mod detect;
pub mod reader;

/// The DSARC signature: `"DSARC FL"`.
pub const ARCHIVE_SIGNATURE: &[u8; 8] = b"DSARC FL";

/// The only DSARC format version accepted by the parser and written by the
/// builder.
pub const ARCHIVE_VERSION: i32 = 1;

/// Size of the DSARC header (signature, entry count, version).
pub const ARCHIVE_HEADER_SIZE: usize = 16;

/// Size of the fixed name field of a DSARC entry record.
pub const NAME_SIZE: usize = 40;

/// Size of one DSARC entry record: name, size and offset.
pub const ARCHIVE_RECORD_SIZE: usize = NAME_SIZE + 8;

/// The DSEQ bundle signature.
pub const BUNDLE_SIGNATURE: &[u8; 4] = b"DSEQ";

/// Size of the DSEQ header.
pub const BUNDLE_HEADER_SIZE: usize = 48;

/// Bias added to the first chunk offset when it is stored in the bundle
/// header. The other two offsets are stored as-is.
pub const FIRST_CHUNK_OFFSET_BIAS: i32 = 16;

/// Byte offset of the optional 4-byte tag inside the bundle header.
pub const BUNDLE_TAG_OFFSET: usize = 44;

/// Length of the bundle tag.
pub const BUNDLE_TAG_SIZE: usize = 4;

/// Header field offsets of the DSEQ bundle.
pub mod bundle_field {
    /// First chunk (sequence) offset, stored with the +16 bias.
    pub const SEQUENCE_OFFSET: usize = 16;
    /// Second chunk (bank) offset.
    pub const BANK_OFFSET: usize = 20;
    /// Third chunk (wave archive) offset.
    pub const WAVE_ARCHIVE_OFFSET: usize = 24;
    /// First chunk size.
    pub const SEQUENCE_SIZE: usize = 32;
    /// Second chunk size.
    pub const BANK_SIZE: usize = 36;
    /// Third chunk size.
    pub const WAVE_ARCHIVE_SIZE: usize = 40;
}

/// Name of the manifest file that records entry name to source mappings.
pub const MAPPER_FILE_NAME: &str = "mapper.txt";
