//! Entry tree types shared by both container codecs.

use std::path::PathBuf;

use crate::format::detect::ArchiveType;

/// One item inside a parsed container.
///
/// Entries are plain values built bottom-up: a bundle entry is created with
/// its three chunk children already attached and is never mutated after
/// parsing. Every parse call produces a fresh tree owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Logical name. For archive entries this is the decoded 40-byte name
    /// field; for bundle chunks it is the base name plus the chunk extension.
    pub name: String,
    /// Payload length in bytes.
    pub size: u64,
    /// Offset of the payload inside the owning container buffer.
    ///
    /// For bundle chunks this is relative to the bundle, not to the
    /// archive the bundle may be embedded in.
    pub offset: u64,
    /// Whether the payload is itself a parsed DSEQ bundle.
    pub is_bundle: bool,
    /// The bundle chunks, populated only when `is_bundle` is set.
    pub children: Vec<Entry>,
}

impl Entry {
    /// Creates a leaf entry with no children.
    pub fn file(name: impl Into<String>, size: u64, offset: u64) -> Self {
        Self {
            name: name.into(),
            size,
            offset,
            is_bundle: false,
            children: Vec::new(),
        }
    }

    /// Creates an entry whose payload is a bundle with the given chunks.
    pub fn bundle(name: impl Into<String>, size: u64, offset: u64, children: Vec<Entry>) -> Self {
        Self {
            name: name.into(),
            size,
            offset,
            is_bundle: true,
            children,
        }
    }

    /// Creates a placeholder entry carrying only a name.
    ///
    /// Used by folder inspection for references whose size is not known.
    pub fn named(name: impl Into<String>) -> Self {
        Self::file(name, 0, 0)
    }

    /// Returns the end of the payload range (`offset + size`).
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }

    /// Returns the extension of the entry name including the leading dot,
    /// or an empty string.
    pub fn extension(&self) -> &str {
        crate::naming::split_name(self.file_name()).1
    }

    /// Returns the last path component of the name.
    pub fn file_name(&self) -> &str {
        crate::naming::last_component(&self.name)
    }

    /// Returns the name without its final extension.
    pub fn stem(&self) -> &str {
        crate::naming::split_name(self.file_name()).0
    }

    /// Returns this entry's payload within its owning buffer, or `None` if
    /// the range does not fit.
    pub fn data<'a>(&self, buf: &'a [u8]) -> Option<&'a [u8]> {
        let start = usize::try_from(self.offset).ok()?;
        let end = usize::try_from(self.end()).ok()?;
        buf.get(start..end)
    }

    /// Finds a child chunk by name.
    pub fn child(&self, name: &str) -> Option<&Entry> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// The result of inspecting a loose folder before any archive exists.
#[derive(Debug, Clone)]
pub struct ImportResult {
    /// The container type the folder is shaped like.
    pub file_type: ArchiveType,
    /// The entries that a save would produce, in order.
    pub entries: Vec<Entry>,
    /// The inspected folder.
    pub source_folder: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_names() {
        let e = Entry::file("sub/dir/voice.sseq", 10, 48);
        assert_eq!(e.file_name(), "voice.sseq");
        assert_eq!(e.stem(), "voice");
        assert_eq!(e.extension(), ".sseq");
        assert_eq!(e.end(), 58);
    }

    #[test]
    fn test_bundle_entry_children() {
        let chunks = vec![
            Entry::file("bgm.sseq", 4, 48),
            Entry::file("bgm.sbnk", 4, 52),
            Entry::file("bgm.swar", 4, 56),
        ];
        let e = Entry::bundle("bgm.msnd", 60, 64, chunks);
        assert!(e.is_bundle);
        assert_eq!(e.children.len(), 3);
        assert_eq!(e.child("bgm.sbnk").map(|c| c.offset), Some(52));
        assert!(e.child("bgm.txt").is_none());
    }

    #[test]
    fn test_named_placeholder() {
        let e = Entry::named("missing.bin");
        assert_eq!(e.size, 0);
        assert!(!e.is_bundle);
        assert!(e.children.is_empty());
    }

    #[test]
    fn test_dotfile_has_no_extension() {
        let e = Entry::file(".hidden", 0, 0);
        assert_eq!(e.stem(), ".hidden");
        assert_eq!(e.extension(), "");
    }
}
