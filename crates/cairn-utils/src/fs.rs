use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{FileSystemError, FileSystemResult};

/// Suffix appended to a destination path while its content is being staged.
pub const STAGING_SUFFIX: &str = ".part";

/// Creates a directory structure if it doesn't exist.
///
/// If the directory already exists, this function does nothing. If the path exists but is
/// not a directory, an error is returned instead of silently reusing it.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
///
/// # Example
///
/// ```no_run
/// use cairn_utils::error::FileSystemResult;
/// use cairn_utils::fs::ensure_dir_exists;
///
/// fn main() -> FileSystemResult<()> {
///     ensure_dir_exists("/tmp/cairn-doc/cache")?;
///     Ok(())
/// }
/// ```
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).map_err(|err| {
            FileSystemError::Directory {
                path: path.to_path_buf(),
                action: "create",
                source: err,
            }
        })?;
    } else if !path.is_dir() {
        return Err(FileSystemError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Removes the specified file or directory, ignoring paths that don't exist.
///
/// # Errors
///
/// Returns [`FileSystemError::File`] if the removal fails for any reason other than the
/// path not existing.
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(());
    }

    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    result.map_err(|err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "remove",
            source: err,
        }
    })
}

/// Returns the staging path used while `dest` is being written.
///
/// The staging file lives next to its destination so the final rename never crosses a
/// filesystem boundary.
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use cairn_utils::fs::staging_path;
///
/// let staged = staging_path("/cache/remote_ab.xml");
/// assert_eq!(staged, PathBuf::from("/cache/remote_ab.xml.part"));
/// ```
pub fn staging_path<P: AsRef<Path>>(dest: P) -> PathBuf {
    let mut staged = dest.as_ref().as_os_str().to_owned();
    staged.push(STAGING_SUFFIX);
    PathBuf::from(staged)
}

/// Atomically replaces `dest` with the staged file at `staged`.
///
/// # Errors
///
/// Returns [`FileSystemError::File`] if the rename fails. The staged file is left in place
/// so the caller decides whether to discard it.
pub fn commit_staged<P: AsRef<Path>, Q: AsRef<Path>>(staged: P, dest: Q) -> FileSystemResult<()> {
    let dest = dest.as_ref();
    fs::rename(staged.as_ref(), dest).map_err(|err| {
        FileSystemError::File {
            path: dest.to_path_buf(),
            action: "commit",
            source: err,
        }
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_ensure_dir_exists_creates_ancestors() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("c");
        ensure_dir_exists(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_ensure_dir_exists_already_exists() {
        let dir = tempdir().unwrap();
        ensure_dir_exists(dir.path()).unwrap();
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_ensure_dir_exists_file_collision() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("file.txt");
        fs::write(&file_path, "hello").unwrap();
        assert!(matches!(
            ensure_dir_exists(&file_path),
            Err(FileSystemError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_safe_remove_file_and_missing() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_file.txt");
        fs::write(&file_path, "hello").unwrap();
        safe_remove(&file_path).unwrap();
        assert!(!file_path.exists());

        safe_remove(dir.path().join("non_existent.txt")).unwrap();
    }

    #[test]
    fn test_staging_path_appends_suffix() {
        assert_eq!(
            staging_path("package_core.xml"),
            PathBuf::from("package_core.xml.part")
        );
    }

    #[test]
    fn test_commit_staged_overwrites_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("remote_x.xml");
        let staged = staging_path(&dest);

        fs::write(&dest, "old").unwrap();
        fs::write(&staged, "new").unwrap();
        commit_staged(&staged, &dest).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
        assert!(!staged.exists());
    }

    #[test]
    fn test_commit_staged_missing_source() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("remote_x.xml");
        let result = commit_staged(staging_path(&dest), &dest);
        assert!(matches!(result, Err(FileSystemError::File { .. })));
    }
}
