//! Collision-free destination paths.
//!
//! Candidates are tried in order: `name.ext`, `name_1.ext`, `name_2.ext`, ...
//! The counter always attaches to the original stem, before the last
//! extension.

use std::ffi::{OsStr, OsString};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Returns the `n`th candidate for `file_name` inside `dir` (0 is the name itself).
pub fn candidate(dir: &Path, file_name: &OsStr, n: usize) -> PathBuf {
    if n == 0 {
        return dir.join(file_name);
    }

    let as_path = Path::new(file_name);
    let stem = as_path.file_stem().unwrap_or(file_name);
    let mut name = OsString::from(stem);
    name.push(format!("_{}", n));
    if let Some(ext) = as_path.extension() {
        name.push(".");
        name.push(ext);
    }
    dir.join(name)
}

/// Returns the first candidate for which `taken` is false.
pub fn allocate_with<F>(dir: &Path, file_name: &OsStr, mut taken: F) -> PathBuf
where
    F: FnMut(&Path) -> bool,
{
    (0..)
        .map(|n| candidate(dir, file_name, n))
        .find(|path| !taken(path))
        .unwrap_or_else(|| dir.join(file_name))
}

/// Returns a path inside `dir` that does not exist at the time of the check.
///
/// Reads directory state only. Two callers racing on the same directory can
/// receive the same answer; use [`create_unique`] when writers run
/// concurrently.
///
/// # Examples
///
/// ```no_run
/// use media_sorter::path_allocator::allocate;
/// use std::ffi::OsStr;
/// use std::path::Path;
///
/// let path = allocate(Path::new("/sorted/photos"), OsStr::new("a.jpg"));
/// assert!(!path.exists());
/// ```
pub fn allocate(dir: &Path, file_name: &OsStr) -> PathBuf {
    allocate_with(dir, file_name, |path| path.symlink_metadata().is_ok())
}

/// Atomically creates the first free candidate and returns it opened for writing.
///
/// Uses exclusive creation, so a path that appears between the check and the
/// create is skipped rather than overwritten.
pub fn create_unique(dir: &Path, file_name: &OsStr) -> std::io::Result<(PathBuf, File)> {
    for n in 0.. {
        let path = candidate(dir, file_name, n);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "no free destination name",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_candidates() {
        let dir = Path::new("/d");
        assert_eq!(candidate(dir, OsStr::new("a.jpg"), 0), Path::new("/d/a.jpg"));
        assert_eq!(candidate(dir, OsStr::new("a.jpg"), 1), Path::new("/d/a_1.jpg"));
        assert_eq!(
            candidate(dir, OsStr::new("a.tar.gz"), 2),
            Path::new("/d/a.tar_2.gz")
        );
        assert_eq!(candidate(dir, OsStr::new("README"), 3), Path::new("/d/README_3"));
        assert_eq!(candidate(dir, OsStr::new(".bashrc"), 1), Path::new("/d/.bashrc_1"));
    }

    #[test]
    fn test_allocate_free_name() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = allocate(temp_dir.path(), OsStr::new("a.jpg"));
        assert_eq!(path, temp_dir.path().join("a.jpg"));
    }

    #[test]
    fn test_allocate_skips_existing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("a.jpg"), b"1").unwrap();
        fs::write(temp_dir.path().join("a_1.jpg"), b"2").unwrap();

        let path = allocate(temp_dir.path(), OsStr::new("a.jpg"));
        assert_eq!(path, temp_dir.path().join("a_2.jpg"));
    }

    #[test]
    fn test_allocate_does_not_create() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = allocate(temp_dir.path(), OsStr::new("a.jpg"));
        assert!(!path.exists());
    }

    #[test]
    fn test_allocate_with_reserved_paths() {
        let dir = Path::new("/d");
        let reserved: HashSet<PathBuf> = [dir.join("x.mp4"), dir.join("x_1.mp4")].into();
        let path = allocate_with(dir, OsStr::new("x.mp4"), |p| reserved.contains(p));
        assert_eq!(path, dir.join("x_2.mp4"));
    }

    #[test]
    fn test_create_unique_never_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("a.jpg"), b"original").unwrap();

        let (first, _) = create_unique(temp_dir.path(), OsStr::new("a.jpg")).unwrap();
        let (second, _) = create_unique(temp_dir.path(), OsStr::new("a.jpg")).unwrap();

        assert_eq!(first, temp_dir.path().join("a_1.jpg"));
        assert_eq!(second, temp_dir.path().join("a_2.jpg"));
        assert_eq!(
            fs::read(temp_dir.path().join("a.jpg")).unwrap(),
            b"original"
        );
    }

    #[test]
    fn test_create_unique_missing_dir_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = create_unique(&temp_dir.path().join("absent"), OsStr::new("a.jpg"));
        assert!(result.is_err());
    }
}
