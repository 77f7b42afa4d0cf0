//! Product archive unpacking.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use sat_common::write_atomically;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::{RenderError, RenderResult};

/// Extract the members of `archive` next to it, writing only those missing.
///
/// Returns the on-disk paths of all file members in archive order. Directory
/// entries are skipped. Entries that would escape the archive's directory
/// are rejected.
pub fn unzip_scene_files(archive: &Path) -> RenderResult<Vec<PathBuf>> {
    let dir = match archive.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut zip = ZipArchive::new(BufReader::new(File::open(archive)?))?;
    let mut members = Vec::with_capacity(zip.len());
    let mut extracted = 0;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let Some(relative) = entry.enclosed_name() else {
            return Err(RenderError::UnsafeArchiveEntry {
                archive: archive.to_path_buf(),
                entry: entry.name().to_string(),
            });
        };

        let target = dir.join(relative);
        if !target.exists() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            write_atomically(&target, |out| io::copy(&mut entry, out).map(|_| ()))?;
            debug!(member = %target.display(), "Extracted archive member");
            extracted += 1;
        }

        members.push(target);
    }

    if extracted > 0 {
        info!(
            archive = %archive.display(),
            extracted,
            members = members.len(),
            "Unpacked archive"
        );
    } else {
        debug!(archive = %archive.display(), "All archive members already present");
    }

    Ok(members)
}

/// The member with the payload extension (without the dot).
///
/// With several candidates the first in archive order wins.
pub fn find_payload(members: &[PathBuf], extension: &str, archive: &Path) -> RenderResult<PathBuf> {
    let mut candidates = members
        .iter()
        .filter(|m| m.extension().map_or(false, |e| e == extension));

    let payload = candidates
        .next()
        .ok_or_else(|| RenderError::PayloadNotFound {
            archive: archive.to_path_buf(),
            extension: extension.to_string(),
        })?;

    let others = candidates.count();
    if others > 0 {
        warn!(
            archive = %archive.display(),
            payload = %payload.display(),
            ignored = others,
            "Archive holds several payload files, using the first"
        );
    }

    Ok(payload.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_payload_picks_first_match() {
        let members = vec![
            PathBuf::from("/data/manifest.xml"),
            PathBuf::from("/data/a.nat"),
            PathBuf::from("/data/b.nat"),
        ];
        let payload = find_payload(&members, "nat", Path::new("/data/a.zip")).unwrap();
        assert_eq!(payload, PathBuf::from("/data/a.nat"));
    }

    #[test]
    fn test_find_payload_missing() {
        let members = vec![PathBuf::from("/data/manifest.xml")];
        match find_payload(&members, "nat", Path::new("/data/a.zip")) {
            Err(RenderError::PayloadNotFound { archive, extension }) => {
                assert_eq!(archive, PathBuf::from("/data/a.zip"));
                assert_eq!(extension, "nat");
            }
            other => panic!("expected PayloadNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_unzip_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(unzip_scene_files(&path), Err(RenderError::Zip(_))));
    }
}
