//! The `mapper.txt` manifest.
//!
//! A manifest lists `entry name = source` pairs, one per line, in archive
//! order. Sources are paths relative to the manifest's folder and may name a
//! file or a sub-folder that is rebuilt recursively.
//!
//! ```text
//! bgm_00.msnd=bgm_00
//! se/click.swav=click.swav
//! ```

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::format::MAPPER_FILE_NAME;
use crate::fs::{file_name_lossy, list_files_recursive, read_file, write_file};
use crate::naming::last_component;
use crate::Result;

/// One `left=right` manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingLine {
    /// Entry name inside the rebuilt archive.
    pub left: String,
    /// Source reference relative to the manifest folder.
    pub right: String,
}

impl MappingLine {
    /// Creates a mapping line.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

impl fmt::Display for MappingLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.left, self.right)
    }
}

/// Where a manifest reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// An existing sub-folder, to be rebuilt as a nested container.
    Folder(PathBuf),
    /// An existing file at the referenced path.
    File(PathBuf),
    /// A file with the same name found elsewhere below the manifest folder.
    Found(PathBuf),
    /// Nothing matched.
    Unresolved,
}

/// Parses manifest text.
///
/// Lines without `=` are skipped. Each line is split at its first `=` and
/// both halves are trimmed; order is preserved.
///
/// ```rust
/// use dsarc::mapping::{MappingLine, parse_mapping};
///
/// let lines = parse_mapping("a.bin = x.bin\n# comment\nb=c=d\r\n");
/// assert_eq!(lines, [MappingLine::new("a.bin", "x.bin"), MappingLine::new("b", "c=d")]);
/// ```
pub fn parse_mapping(text: &str) -> Vec<MappingLine> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(left, right)| MappingLine::new(left.trim(), right.trim()))
        .collect()
}

/// Renders manifest lines joined by `\n`, without a trailing newline.
pub fn render_mapping(lines: &[MappingLine]) -> String {
    lines
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Returns the manifest path for a folder.
pub fn mapper_path(folder: &Path) -> PathBuf {
    folder.join(MAPPER_FILE_NAME)
}

/// Returns `true` if `folder` has a manifest.
pub fn has_mapper(folder: &Path) -> bool {
    mapper_path(folder).is_file()
}

/// Reads and parses a manifest file. Invalid UTF-8 is decoded lossily.
pub fn read_mapping_file(path: impl AsRef<Path>) -> Result<Vec<MappingLine>> {
    let bytes = read_file(path)?;
    Ok(parse_mapping(&String::from_utf8_lossy(&bytes)))
}

/// Writes a manifest file.
pub fn write_mapping_file(path: impl AsRef<Path>, lines: &[MappingLine]) -> Result<()> {
    write_file(path, render_mapping(lines).as_bytes())
}

/// Resolves a manifest reference against `folder`.
///
/// Tried in order: an existing sub-folder, an existing file, then the first
/// file anywhere below `folder` (sorted walk) whose name equals the
/// reference's last component.
///
/// A reference that points at `folder` itself never resolves to a folder.
pub fn resolve_source(folder: &Path, right: &str) -> Result<SourceRef> {
    if !is_self_reference(right) {
        let candidate = folder.join(right);
        if candidate.is_dir() {
            return Ok(SourceRef::Folder(candidate));
        }
        if candidate.is_file() {
            return Ok(SourceRef::File(candidate));
        }
    }
    match find_file_recursive(folder, last_component(right))? {
        Some(found) => {
            log::debug!(
                "resolved '{right}' by name search to {}",
                found.display()
            );
            Ok(SourceRef::Found(found))
        }
        None => Ok(SourceRef::Unresolved),
    }
}

/// Finds the first file named `file_name` below `folder`, at any depth.
pub fn find_file_recursive(folder: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    if file_name.is_empty() || !folder.is_dir() {
        return Ok(None);
    }
    Ok(list_files_recursive(folder)?
        .into_iter()
        .find(|p| file_name_lossy(p) == file_name))
}

fn is_self_reference(right: &str) -> bool {
    Path::new(right)
        .components()
        .all(|c| matches!(c, Component::CurDir))
}
