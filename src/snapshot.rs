//! Snapshot Store Reader
//!
//! Reads `<version>.json` snapshot files out of the designer's history folder.
//! A missing folder is reported distinctly; a missing or malformed file reads
//! as a snapshot with no tables.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::checksum::Checksum;
use crate::error::Result;
use crate::schema::{SnapshotDocument, TableDefinition};
use crate::version::{list_file_names, snapshot_dir_exists, SnapshotVersion, VersionSelector};

/// Result of reading a snapshot
#[derive(Debug, Clone)]
pub enum SnapshotRead {
    /// The snapshot directory itself does not exist
    MissingDirectory,
    /// The directory exists; tables may be empty
    Tables(LoadedSnapshot),
}

impl SnapshotRead {
    /// The loaded snapshot, if the directory existed
    pub fn loaded(self) -> Option<LoadedSnapshot> {
        match self {
            SnapshotRead::MissingDirectory => None,
            SnapshotRead::Tables(snapshot) => Some(snapshot),
        }
    }
}

/// Raw tables of one snapshot
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub version: SnapshotVersion,
    /// Checksum of the file bytes; `None` when the file was absent
    pub checksum: Option<Checksum>,
    pub tables: Vec<TableDefinition>,
}

impl LoadedSnapshot {
    fn empty(version: SnapshotVersion, checksum: Option<Checksum>) -> Self {
        Self {
            version,
            checksum,
            tables: Vec::new(),
        }
    }
}

/// Directory of versioned snapshot files
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the snapshot directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the snapshot directory exists
    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Path of the file holding `version`
    pub fn path_for(&self, version: &SnapshotVersion) -> PathBuf {
        self.dir.join(version.file_name())
    }

    /// All valid snapshot versions, ascending
    pub fn versions(&self) -> Result<Vec<SnapshotVersion>> {
        let mut versions: Vec<_> = list_file_names(&self.dir)?
            .unwrap_or_default()
            .iter()
            .filter_map(|name| SnapshotVersion::from_file_name(name))
            .collect();
        versions.sort();
        Ok(versions)
    }

    /// Read the snapshot for `version`
    pub fn load(&self, version: &SnapshotVersion) -> Result<SnapshotRead> {
        if !snapshot_dir_exists(&self.dir)? {
            debug!(dir = %self.dir.display(), "no snapshot directory");
            return Ok(SnapshotRead::MissingDirectory);
        }

        let path = self.path_for(version);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "snapshot file not found, no tables");
                return Ok(SnapshotRead::Tables(LoadedSnapshot::empty(version.clone(), None)));
            }
            Err(e) => return Err(e.into()),
        };

        let checksum = Checksum::from_bytes(&content);
        let tables = match serde_json::from_slice::<SnapshotDocument>(&content) {
            Ok(document) => document.into_tables(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable snapshot, treating as empty");
                Vec::new()
            }
        };

        debug!(version = %version, tables = tables.len(), "loaded snapshot");
        Ok(SnapshotRead::Tables(LoadedSnapshot {
            version: version.clone(),
            checksum: Some(checksum),
            tables,
        }))
    }

    /// Select the latest version with `selector` and read it
    pub fn load_latest(&self, selector: &VersionSelector) -> Result<SnapshotRead> {
        let version = selector.select_latest(&self.dir)?;
        self.load(&version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use tempfile::tempdir;

    const USER_SNAPSHOT: &str = r#"{"data":{"classTables":[{"name":"User","tableName":"users","properties":[]}]}}"#;

    #[test]
    fn test_missing_directory_is_distinct() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("designer"));

        let read = store.load(&SnapshotVersion::baseline()).unwrap();
        assert!(matches!(read, SnapshotRead::MissingDirectory));
        assert!(store.versions().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let snapshot = store.load(&SnapshotVersion::baseline()).unwrap().loaded().unwrap();
        assert!(snapshot.tables.is_empty());
        assert!(snapshot.checksum.is_none());
    }

    #[test]
    fn test_malformed_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("1.2.0.json"), "{ not json").unwrap();
        let store = SnapshotStore::new(dir.path());

        let snapshot = store.load_latest(&VersionSelector::default()).unwrap().loaded().unwrap();
        assert_eq!(snapshot.version.version_string(), "1.2.0");
        assert!(snapshot.tables.is_empty());
        assert!(snapshot.checksum.is_some());
    }

    #[test]
    fn test_load_latest_reads_highest_version() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("1.2.0.json"), r#"{"data":{"classTables":[]}}"#).unwrap();
        fs::write(dir.path().join("1.3.0.json"), USER_SNAPSHOT).unwrap();
        let store = SnapshotStore::new(dir.path());

        let snapshot = store.load_latest(&VersionSelector::default()).unwrap().loaded().unwrap();
        assert_eq!(snapshot.version.version_string(), "1.3.0");
        assert_eq!(snapshot.tables.len(), 1);
        assert_eq!(snapshot.tables[0].name, "User");
        assert!(snapshot.checksum.unwrap().verify(USER_SNAPSHOT.as_bytes()));
    }

    #[test]
    fn test_padded_file_name_does_not_hide_latest() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("2.0.0.json"), USER_SNAPSHOT).unwrap();
        fs::write(dir.path().join("3.0.0 .json"), r#"{"data":{"classTables":[]}}"#).unwrap();
        let store = SnapshotStore::new(dir.path());

        let snapshot = store.load_latest(&VersionSelector::default()).unwrap().loaded().unwrap();
        assert_eq!(snapshot.version.version_string(), "2.0.0");
        assert_eq!(snapshot.tables.len(), 1);
    }

    #[test]
    fn test_file_in_place_of_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("designer");
        fs::write(&path, USER_SNAPSHOT).unwrap();
        let store = SnapshotStore::new(&path);

        assert!(matches!(
            store.load(&SnapshotVersion::baseline()),
            Err(SchemaError::SnapshotDirectory { .. })
        ));
        assert!(matches!(
            store.load_latest(&VersionSelector::default()),
            Err(SchemaError::SnapshotDirectory { .. })
        ));
    }

    #[test]
    fn test_versions_sorted() {
        let dir = tempdir().unwrap();
        for name in ["2.0.0.json", "1.10.0.json", "1.9.0.json", "draft.json"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let store = SnapshotStore::new(dir.path());

        let versions: Vec<String> = store
            .versions()
            .unwrap()
            .iter()
            .map(SnapshotVersion::version_string)
            .collect();
        assert_eq!(versions, vec!["1.9.0", "1.10.0", "2.0.0"]);
    }
}
