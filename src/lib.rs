//! # dsarc
//!
//! Reading, writing and round-tripping of two game audio container formats:
//!
//! - **DSARC** (`DSARC FL`, usually `.dat`): a flat archive of named entries.
//! - **DSEQ** (usually `.msnd`): a bundle of exactly three chunks (sequence,
//!   bank, wave archive), standalone or embedded in a DSARC entry.
//!
//! Chunk payloads are opaque. The crate parses both formats from untrusted
//! bytes, extracts them into folder trees that rebuild byte-for-byte, and
//! replaces single bundle chunks without disturbing the rest.
//!
//! ## Quick Start
//!
//! ### Listing and extracting
//!
//! ```rust,no_run
//! use dsarc::{ExtractOptions, LoadedArchive, NoProgress, Result};
//!
//! fn main() -> Result<()> {
//!     let archive = LoadedArchive::open_path("sound.dat")?;
//!     for entry in archive.entries() {
//!         println!("{}: {} bytes", entry.name, entry.size);
//!         for chunk in &entry.children {
//!             println!("  {}: {} bytes", chunk.name, chunk.size);
//!         }
//!     }
//!
//!     let options = ExtractOptions::new().nested(true);
//!     let result = archive.extract_all("./output", &options, &mut NoProgress)?;
//!     println!("{} files in {}", result.files_written, result.out_dir.display());
//!     Ok(())
//! }
//! ```
//!
//! ### Rebuilding
//!
//! ```rust,no_run
//! use dsarc::{NoProgress, Result, rebuild_folder};
//!
//! fn main() -> Result<()> {
//!     if let Some(bytes) = rebuild_folder("./output/sound", &mut NoProgress)? {
//!         std::fs::write("sound.dat", bytes)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Building in memory
//!
//! ```rust
//! use dsarc::archive::{build_from_pairs, parse_archive};
//!
//! # fn main() -> dsarc::Result<()> {
//! let buf = build_from_pairs(&[("a.bin", b"hello".as_slice()), ("b.bin", b"".as_slice())])?;
//! let entries = parse_archive(&buf)?;
//! assert_eq!(entries[0].data(&buf), Some(&b"hello"[..]));
//! assert_eq!(entries[1].size, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Folder layouts
//!
//! A folder rebuilds as a DSARC archive when it holds a `mapper.txt`
//! manifest, as a DSEQ bundle when it holds one `.sseq`, `.sbnk` and `.swar`
//! item (plus an optional `<folder>.txt` tag), and as a pass-through payload
//! when it holds exactly one file. See [`rebuild`] for details.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | No | The `dsarc` command-line tool |
//!
//! ## Logging
//!
//! The library logs through the [`log`] facade and never installs a logger.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod archive;
pub mod bundle;
pub mod entry;
pub mod error;
pub mod format;
pub mod fs;
pub mod import;
pub mod mapping;
pub mod naming;
pub mod progress;
pub mod read;
pub mod rebuild;
pub mod write;

pub use entry::{Entry, ImportResult};
pub use error::{Error, Result};
pub use format::detect::{ArchiveKind, ArchiveType};

// Re-export the open/extract API at crate root for convenience
pub use read::{ArchiveInfo, ExtractOptions, ExtractResult, LoadedArchive};

// Re-export the save API
pub use write::{SaveResult, save_archive};

// Re-export folder operations
pub use import::inspect_folder;
pub use rebuild::{extract_nested, rebuild_folder};

// Re-export progress API
pub use progress::{
    AtomicProgress, NoProgress, ProgressReporter, ProgressState, StatisticsProgress, progress_fn,
};
