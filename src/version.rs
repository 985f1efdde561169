//! Snapshot versioning utilities
//!
//! Snapshot files are named `<semver>.json`. The [`VersionSelector`] picks the
//! highest valid version in a directory, falling back to an explicit baseline
//! when nothing valid is present.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, SchemaError};

/// Version reported when a snapshot directory has no valid versioned file
pub const BASELINE_VERSION: &str = "1.1.0";

/// Migration name used for the very first snapshot
pub const INITIAL_MIGRATION_NAME: &str = "InitialCreate";

const SNAPSHOT_EXTENSION: &str = ".json";

/// A snapshot version (e.g. the `1.2.0` of `1.2.0.json`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotVersion(Version);

impl SnapshotVersion {
    /// Wrap a parsed semantic version
    pub fn new(version: Version) -> Self {
        Self(version)
    }

    /// Parse a strict `major.minor.patch[-pre][+build]` string. Surrounding
    /// whitespace is invalid.
    pub fn parse(version_str: &str) -> std::result::Result<Self, semver::Error> {
        Version::parse(version_str).map(Self)
    }

    /// The baseline version used when no snapshot exists
    pub fn baseline() -> Self {
        Self(Version::new(1, 1, 0))
    }

    /// Extract the version from a snapshot file name like `1.2.0.json`
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(SNAPSHOT_EXTENSION)?;
        Self::parse(stem).ok()
    }

    /// File name of the snapshot holding this version
    pub fn file_name(&self) -> String {
        format!("{}{}", self.0, SNAPSHOT_EXTENSION)
    }

    /// Borrow the underlying semver value
    pub fn as_semver(&self) -> &Version {
        &self.0
    }

    /// Get the version string (e.g., "1.2.3")
    pub fn version_string(&self) -> String {
        self.0.to_string()
    }

    /// SemVer precedence: build metadata is ignored
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        self.0.cmp_precedence(&other.0)
    }

    /// Name for the database migration generated from this snapshot
    pub fn migration_name(&self) -> String {
        if self.0 == Version::new(1, 0, 0) {
            INITIAL_MIGRATION_NAME.to_string()
        } else {
            self.version_string()
        }
    }
}

/// Migration name for an optional latest version; nothing recorded yet means
/// the initial migration
pub fn migration_name_for(version: Option<&SnapshotVersion>) -> String {
    version
        .map(SnapshotVersion::migration_name)
        .unwrap_or_else(|| INITIAL_MIGRATION_NAME.to_string())
}

/// Whether `current` is strictly newer than `stored`.
///
/// Either string failing to parse means there is no comparable change.
pub fn is_newer(current: &str, stored: &str) -> bool {
    match (SnapshotVersion::parse(current), SnapshotVersion::parse(stored)) {
        (Ok(current), Ok(stored)) => current.cmp_precedence(&stored) == Ordering::Greater,
        _ => false,
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SnapshotVersion {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).map_err(|_| SchemaError::InvalidVersion(s.to_string()))
    }
}

/// Picks the latest snapshot version in a directory
#[derive(Debug, Clone)]
pub struct VersionSelector {
    baseline: SnapshotVersion,
}

impl Default for VersionSelector {
    fn default() -> Self {
        Self::new(SnapshotVersion::baseline())
    }
}

impl VersionSelector {
    /// Create a selector that falls back to `baseline`
    pub fn new(baseline: SnapshotVersion) -> Self {
        Self { baseline }
    }

    /// The fallback version
    pub fn baseline(&self) -> &SnapshotVersion {
        &self.baseline
    }

    /// Highest valid version among `file_names`, or the baseline.
    ///
    /// Names that are not `<semver>.json` are skipped silently. Versions equal
    /// in precedence (differing only in build metadata) tie-break on the full
    /// version so the pick does not depend on listing order.
    pub fn latest_of<'a, I>(&self, file_names: I) -> SnapshotVersion
    where
        I: IntoIterator<Item = &'a str>,
    {
        file_names
            .into_iter()
            .filter_map(|name| {
                let version = SnapshotVersion::from_file_name(name);
                if version.is_none() {
                    debug!(file = name, "skipping non-versioned snapshot file");
                }
                version
            })
            .max_by(|a, b| a.cmp_precedence(b).then_with(|| a.cmp(b)))
            .unwrap_or_else(|| self.baseline.clone())
    }

    /// Highest valid snapshot version in `dir`.
    ///
    /// A missing directory resolves to the baseline. Failing to list a
    /// directory that does exist is an environment error.
    pub fn select_latest(&self, dir: &Path) -> Result<SnapshotVersion> {
        let names = match list_file_names(dir)? {
            Some(names) => names,
            None => {
                debug!(dir = %dir.display(), "snapshot directory missing, using baseline");
                return Ok(self.baseline.clone());
            }
        };

        Ok(self.latest_of(names.iter().map(String::as_str)))
    }
}

/// Whether `dir` exists as a snapshot directory.
///
/// A path that exists but is not a directory, or cannot be inspected, is an
/// environment error.
pub(crate) fn snapshot_dir_exists(dir: &Path) -> Result<bool> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(true),
        Ok(_) => Err(SchemaError::SnapshotDirectory {
            path: dir.to_path_buf(),
            source: io::Error::new(ErrorKind::Other, "not a directory"),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(SchemaError::SnapshotDirectory {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// Names of the files directly inside `dir` (symlinks followed), or `None`
/// when the directory does not exist
pub(crate) fn list_file_names(dir: &Path) -> Result<Option<Vec<String>>> {
    if !snapshot_dir_exists(dir)? {
        return Ok(None);
    }

    let entries = fs::read_dir(dir).map_err(|source| SchemaError::SnapshotDirectory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        // Dangling links and unreadable entries are not snapshots
        match fs::metadata(entry.path()) {
            Ok(meta) if meta.is_file() => {}
            _ => continue,
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }

    Ok(Some(names))
}
