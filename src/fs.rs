//! Raw file primitives used as leaves by the extract and save operations.
//!
//! Directory listings are sorted by file name so that every operation that
//! walks a folder sees the same order on every platform.

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::format::reader::read_up_to;
use crate::{Error, Result};

/// Reads a whole file.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    Ok(fs::read(path.as_ref())?)
}

/// Writes a whole file, creating missing parent directories.
pub fn write_file(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.flush()?;
    Ok(())
}

/// Reads up to `size` bytes starting at `offset`.
///
/// The result is shorter than `size` when the file ends first.
pub fn read_range(path: impl AsRef<Path>, offset: u64, size: usize) -> Result<Vec<u8>> {
    let mut file = File::open(path.as_ref())?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; size];
    let n = read_up_to(&mut file, &mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

/// Copies a file into a folder under its own name, overwriting.
///
/// Returns the destination path.
pub fn copy_file_to_folder(
    source: impl AsRef<Path>,
    dest_folder: impl AsRef<Path>,
) -> Result<PathBuf> {
    let source = source.as_ref();
    let dest_folder = dest_folder.as_ref();
    let name = source.file_name().ok_or_else(|| {
        Error::InvalidArgument(format!("'{}' has no file name", source.display()))
    })?;
    fs::create_dir_all(dest_folder)?;
    let dest = dest_folder.join(name);
    fs::copy(source, &dest)?;
    Ok(dest)
}

/// Fails with [`Error::DirectoryNotFound`] unless `folder` is a directory.
pub fn require_dir(folder: &Path) -> Result<()> {
    if folder.is_dir() {
        Ok(())
    } else {
        Err(Error::DirectoryNotFound(folder.to_path_buf()))
    }
}

/// Lists every regular file below `folder`, at all depths, sorted.
pub fn list_files_recursive(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Lists the regular files directly inside `folder`, sorted.
pub fn list_top_files(folder: &Path) -> Result<Vec<PathBuf>> {
    Ok(list_top_level(folder)?
        .into_iter()
        .filter(|p| p.is_file())
        .collect())
}

/// Lists the files and sub-folders directly inside `folder`, sorted.
pub fn list_top_level(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut items = fs::read_dir(folder)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    items.sort();
    Ok(items)
}

/// Returns the final component of a path as a string, lossily.
pub(crate) fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Returns `path` relative to `base` with `/` separators.
pub(crate) fn relative_name(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c.bin");
        write_file(&path, b"data").unwrap();
        assert_eq!(read_file(&path).unwrap(), b"data");
    }

    #[test]
    fn test_read_range_short() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.bin");
        write_file(&path, b"0123456789").unwrap();
        assert_eq!(read_range(&path, 2, 3).unwrap(), b"234");
        assert_eq!(read_range(&path, 8, 10).unwrap(), b"89");
        assert!(read_range(&path, 20, 4).unwrap().is_empty());
    }

    #[test]
    fn test_copy_file_to_folder() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.bin");
        write_file(&src, b"abc").unwrap();
        let dest = copy_file_to_folder(&src, dir.path().join("out")).unwrap();
        assert_eq!(dest, dir.path().join("out/src.bin"));
        assert_eq!(read_file(dest).unwrap(), b"abc");
    }

    #[test]
    fn test_listings_are_sorted() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path().join("b.bin"), b"").unwrap();
        write_file(dir.path().join("a.bin"), b"").unwrap();
        write_file(dir.path().join("sub/c.bin"), b"").unwrap();

        let all: Vec<_> = list_files_recursive(dir.path())
            .unwrap()
            .iter()
            .map(|p| relative_name(dir.path(), p))
            .collect();
        assert_eq!(all, ["a.bin", "b.bin", "sub/c.bin"]);

        let top: Vec<_> = list_top_level(dir.path())
            .unwrap()
            .iter()
            .map(|p| file_name_lossy(p))
            .collect();
        assert_eq!(top, ["a.bin", "b.bin", "sub"]);
        assert_eq!(list_top_files(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_require_dir() {
        let dir = TempDir::new().unwrap();
        assert!(require_dir(dir.path()).is_ok());
        assert!(matches!(
            require_dir(&dir.path().join("missing")),
            Err(Error::DirectoryNotFound(_))
        ));
    }
}
