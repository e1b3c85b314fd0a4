//! Storage-format version stamp.
//!
//! Each storage root carries a small `.ver` file recording the driver type
//! and the format version it was created with. Opening an existing root
//! checks the stamp before touching any data.

use crate::error::{Result, StorageError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Current on-disk format version.
pub const CURRENT_STORAGE_VERSION: i32 = 1;

/// Name of the stamp file inside a storage root.
pub const VERSION_FILE: &str = ".ver";

/// Contents of the stamp file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageVersion {
    pub dbtype: String,
    pub version: i32,
}

/// Path of the stamp file for a storage root.
pub fn version_file(root: &Path) -> PathBuf {
    root.join(VERSION_FILE)
}

/// Read the stamp of a storage root, if it has one.
pub fn read_version(root: &Path) -> Result<Option<StorageVersion>> {
    match fs::read(version_file(root)) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write or verify the stamp of a storage root.
///
/// With `create == true` a fresh stamp for `db_type` at the current version
/// is written. Otherwise the existing stamp must name `db_type` and the
/// current version: a missing stamp fails with
/// [`StorageError::DoesNotExist`], a different one with
/// [`StorageError::VersionCheckFailed`].
pub fn check_version(db_type: &str, root: &Path, create: bool) -> Result<()> {
    if create {
        fs::create_dir_all(root)?;
        let stamp = StorageVersion {
            dbtype: db_type.to_string(),
            version: CURRENT_STORAGE_VERSION,
        };
        fs::write(version_file(root), serde_json::to_vec(&stamp)?)?;
        debug!(path = %root.display(), db_type, "wrote storage version stamp");
        return Ok(());
    }

    let stamp = read_version(root)?.ok_or_else(|| StorageError::DoesNotExist(root.to_path_buf()))?;
    if stamp.dbtype == db_type && stamp.version == CURRENT_STORAGE_VERSION {
        return Ok(());
    }

    warn!(
        path = %root.display(),
        found_type = %stamp.dbtype,
        found_version = stamp.version,
        "storage version mismatch"
    );
    Err(StorageError::VersionCheckFailed {
        found_type: stamp.dbtype,
        found_version: stamp.version,
        expected_type: db_type.to_string(),
        expected_version: CURRENT_STORAGE_VERSION,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_then_open() {
        let dir = TempDir::new().unwrap();
        check_version("t", dir.path(), true).unwrap();
        check_version("t", dir.path(), false).unwrap();

        let stamp = read_version(dir.path()).unwrap().unwrap();
        assert_eq!(
            stamp,
            StorageVersion {
                dbtype: "t".into(),
                version: CURRENT_STORAGE_VERSION
            }
        );
    }

    #[test]
    fn test_type_mismatch() {
        let dir = TempDir::new().unwrap();
        check_version("t", dir.path(), true).unwrap();

        let result = check_version("other", dir.path(), false);
        assert!(matches!(result, Err(StorageError::VersionCheckFailed { .. })));
    }

    #[test]
    fn test_version_mismatch() {
        let dir = TempDir::new().unwrap();
        fs::write(
            version_file(dir.path()),
            br#"{"dbtype":"t","version":99}"#,
        )
        .unwrap();

        let result = check_version("t", dir.path(), false);
        assert!(matches!(
            result,
            Err(StorageError::VersionCheckFailed {
                found_version: 99,
                ..
            })
        ));
    }

    #[test]
    fn test_missing_stamp() {
        let dir = TempDir::new().unwrap();
        let result = check_version("t", dir.path(), false);
        assert!(matches!(result, Err(StorageError::DoesNotExist(_))));
        assert!(read_version(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_garbage_stamp() {
        let dir = TempDir::new().unwrap();
        fs::write(version_file(dir.path()), b"\x00\x01not json").unwrap();

        let result = check_version("t", dir.path(), false);
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_create_makes_missing_dirs() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        check_version("t", &nested, true).unwrap();
        assert!(version_file(&nested).exists());
    }
}
