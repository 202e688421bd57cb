//! Small filesystem primitives used when materializing jobs and writing the merged artifact.
use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Creates `path` and any missing parents. Succeeds if the directory already exists, fails if
/// something that is not a directory is in the way or creation is not permitted.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if path.exists() && !path.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("path is not a directory: {:?}", path),
        ));
    }
    DirBuilder::new().recursive(true).create(path)
}

/// Writes `contents` to a temporary file next to `path` and renames it into place, so readers
/// never observe a partially written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Writes an executable shell script.
pub fn write_script(path: &Path, contents: &str) -> io::Result<()> {
    fs::write(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// An exclusive, advisory lock held for as long as the value lives. The lock is a sibling file
/// created with create-new semantics; it is removed on drop.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    _file: File,
}

/// The lock file guarding `target`: `<name>.lock` in the same directory.
pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}

impl LockFile {
    pub fn acquire(target: &Path) -> io::Result<Self> {
        let path = lock_path(target);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => io::Error::new(
                    io::ErrorKind::WouldBlock,
                    format!("lock already held: {:?}", path),
                ),
                _ => e,
            })?;
        writeln!(file, "{}", std::process::id())?;

        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("H1").join("trigger_output");

        ensure_dir(&dir).unwrap();
        ensure_dir(&dir).unwrap();

        assert!(dir.is_dir());
    }

    #[test]
    fn test_ensure_dir_fails_when_file_in_the_way() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("H1");
        fs::write(&blocker, "not a dir").unwrap();

        assert!(ensure_dir(&blocker).is_err());
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("glitch_info.json");

        let lock = LockFile::acquire(&target).unwrap();
        assert!(lock.path().exists());

        let err = LockFile::acquire(&target).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        let lock_path = lock.path().to_path_buf();
        drop(lock);
        assert!(!lock_path.exists());
        assert!(LockFile::acquire(&target).is_ok());
    }
}
