//! Filesystem helpers for cache entries.
//!
//! Every artifact the pipeline caches (archives, extracted members, rendered
//! frames, the animation) is written to a temporary sibling first and renamed
//! into place once complete. A path that exists is therefore always a finished
//! entry, which is what the presence checks rely on.

use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Suffix appended to in-flight downloads.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Sibling path used while `path` is being written (`<name>.partial`).
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Write `path` through a temporary file in the same directory.
///
/// The closure receives the open temporary file. On success the file is
/// synced and atomically renamed over `path` (replacing any existing file);
/// on failure the temporary file is removed and `path` is left untouched.
pub fn write_atomically<T, E, F>(path: &Path, write: F) -> Result<T, E>
where
    F: FnOnce(&mut File) -> Result<T, E>,
    E: From<io::Error>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(dir)?;

    let value = write(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_path_appends_suffix() {
        let path = Path::new("/data/MSG3-SEVI-MSG15.zip");
        assert_eq!(
            partial_path(path),
            PathBuf::from("/data/MSG3-SEVI-MSG15.zip.partial")
        );
    }

    #[test]
    fn test_write_atomically_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        std::fs::write(&path, b"old").unwrap();

        write_atomically(&path, |file| file.write_all(b"new")).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomically_leaves_nothing_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");

        let result: io::Result<()> = write_atomically(&path, |file| {
            file.write_all(b"half")?;
            Err(io::Error::new(io::ErrorKind::Other, "encoder failed"))
        });

        assert!(result.is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
