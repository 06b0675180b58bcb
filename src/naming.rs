//! Collision-free output names for extraction.
//!
//! Names are derived from a base and an extension. Repeats of the same pair
//! within one [`NameCounters`] table get `_2`, `_3`, ... suffixes; if a
//! candidate is already taken on disk (or was already handed out by the
//! same table) a second `_<n>` suffix is appended until it is free.

use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Per-destination name counter table.
///
/// One table must be shared across all siblings written into the same
/// folder during a single extraction. Tables are never global.
#[derive(Debug, Default, Clone)]
pub struct NameCounters {
    counts: HashMap<(String, String), u32>,
    issued: HashSet<String>,
}

impl NameCounters {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of names handed out so far.
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    /// Returns `true` if no name has been handed out.
    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    /// Marks `name` as taken without consuming a counter.
    ///
    /// Used for fixed names such as `mapper.txt` that are written after
    /// the entries of the same folder.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.issued.insert(name.into());
    }

    fn next_count(&mut self, base: &str, ext: &str) -> u32 {
        let count = self
            .counts
            .entry((base.to_string(), ext.to_string()))
            .or_insert(0);
        *count += 1;
        *count
    }
}

/// Produces a unique file or folder name inside `outdir`.
///
/// `ext` includes its leading dot; pass `""` for folders. The first request
/// for a pair yields `base + ext`, later ones `base_N + ext`. A candidate that
/// already exists in `outdir` becomes `base_N_M + ext` with the smallest free
/// `M`.
///
/// ```rust
/// use dsarc::naming::{NameCounters, unique_out_name};
///
/// let dir = std::env::temp_dir().join("dsarc-doc-naming-does-not-exist");
/// let mut counters = NameCounters::new();
/// assert_eq!(unique_out_name("bgm", ".sseq", &dir, &mut counters), "bgm.sseq");
/// assert_eq!(unique_out_name("bgm", ".sseq", &dir, &mut counters), "bgm_2.sseq");
/// assert_eq!(unique_out_name("bgm", "", &dir, &mut counters), "bgm");
/// ```
pub fn unique_out_name(
    base: &str,
    ext: &str,
    outdir: &Path,
    counters: &mut NameCounters,
) -> String {
    let count = counters.next_count(base, ext);
    let candidate = if count == 1 {
        format!("{base}{ext}")
    } else {
        format!("{base}_{count}{ext}")
    };

    let taken = |name: &str, counters: &NameCounters| {
        counters.issued.contains(name) || std::fs::symlink_metadata(outdir.join(name)).is_ok()
    };

    let mut final_name = candidate;
    let mut extra = 1u32;
    while taken(&final_name, counters) {
        final_name = format!("{base}_{count}_{extra}{ext}");
        extra += 1;
    }
    if extra > 1 {
        log::debug!(
            "name collision for '{base}{ext}' in {}, using '{final_name}'",
            outdir.display()
        );
    }
    counters.issued.insert(final_name.clone());
    final_name
}

/// Splits a file name into stem and extension.
///
/// The extension starts at the last dot and keeps it. A leading dot does not
/// start an extension.
///
/// ```rust
/// use dsarc::naming::split_name;
///
/// assert_eq!(split_name("bgm.tar.sseq"), ("bgm.tar", ".sseq"));
/// assert_eq!(split_name("README"), ("README", ""));
/// assert_eq!(split_name(".txt"), (".txt", ""));
/// ```
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name, ""),
    }
}

/// Returns the final `/`- or `\`-separated component of a name.
pub fn last_component(name: &str) -> &str {
    match name.rfind(['/', '\\']) {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Returns a disk-safe file name for an archive entry.
///
/// Only the last path component is kept. Empty, `.` and `..` components
/// become `file_<index>`.
pub fn entry_file_name(name: &str, index: usize) -> String {
    match last_component(name) {
        "" | "." | ".." => format!("file_{index}"),
        other => other.to_string(),
    }
}
