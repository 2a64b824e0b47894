// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

pub mod mock;

pub use mock::MockFileSystem;

/// Abstract filesystem interface used by the transformation units.
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Write `contents`, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Remove a file or a whole directory tree. Missing paths are fine.
    fn remove(&self, path: &Path) -> Result<()>;

    /// Last modification time, if the backend knows it.
    fn modified(&self, path: &Path) -> Result<Option<SystemTime>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        fs::write(path, contents).with_context(|| format!("writing to file {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let res = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        match res {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("removing {:?}", path)),
        }
    }

    fn modified(&self, path: &Path) -> Result<Option<SystemTime>> {
        let meta = fs::metadata(path).with_context(|| format!("stat {:?}", path))?;
        Ok(meta.modified().ok())
    }
}

/// Every file below `root`, depth-first, in sorted order.
///
/// A missing root yields an empty list.
pub fn walk_files(fs: &dyn FileSystem, root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(root) {
        return Ok(files);
    }

    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = fs.read_dir(&dir)?;
        entries.sort();
        // Reverse so the stack pops in sorted order.
        for entry in entries.into_iter().rev() {
            if fs.is_dir(&entry) {
                stack.push(entry);
            } else if fs.is_file(&entry) {
                files.push(entry);
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_fs_write_creates_parents_and_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFileSystem;
        let file = dir.path().join("a/b/c.txt");

        fs.write(&file, b"hello").unwrap();
        assert_eq!(fs.read_to_string(&file).unwrap(), "hello");
        assert!(fs.modified(&file).unwrap().is_some());

        fs.remove(&dir.path().join("a")).unwrap();
        assert!(!fs.exists(&file));
        fs.remove(&dir.path().join("a")).unwrap();
    }

    #[test]
    fn walk_lists_nested_files_sorted() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/b.txt", "b");
        fs.add_file("/p/src/nested/a.txt", "a");
        fs.add_file("/p/src/a.txt", "a");

        let files = walk_files(&fs, Path::new("/p/src")).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/p/src/a.txt"),
                PathBuf::from("/p/src/b.txt"),
                PathBuf::from("/p/src/nested/a.txt"),
            ]
        );
        assert!(walk_files(&fs, Path::new("/p/missing")).unwrap().is_empty());
    }
}
