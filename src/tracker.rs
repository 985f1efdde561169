//! Change Tracker
//!
//! Remembers the last snapshot version a caller acted on and answers whether
//! the designer has produced a newer one since. Persistence goes through the
//! [`KeyValueStore`] capability so tests can use [`MemoryStore`].
//!
//! Read-then-write of the stored value is not atomic; one invocation at a time.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, SchemaError};
use crate::version::{is_newer, SnapshotVersion, VersionSelector};

/// Key under which the last processed version is stored by default
pub const DEFAULT_VERSION_KEY: &str = "lastProcessedVersion";

/// Durable string key/value storage
pub trait KeyValueStore {
    /// Read a value; `None` when absent
    fn get_value(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set_value(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a flat JSON object on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<temp>/coffee-designer/localstorage/coffee-database.json`
    pub fn default_path() -> PathBuf {
        std::env::temp_dir()
            .join("coffee-designer")
            .join("localstorage")
            .join("coffee-database.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents. Missing or unparsable files read as empty; values of
    /// any JSON type are kept so other writers' keys survive a rewrite.
    fn read_all(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read state store");
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(values)) => values,
            Ok(_) => {
                warn!(path = %self.path.display(), "state store is not a JSON object, ignoring");
                Map::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt state store, ignoring");
                Map::new()
            }
        }
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_value(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.read_all().remove(key) {
            Some(Value::String(value)) => Some(value),
            Some(other) => {
                debug!(key, value = %other, "stored value is not a string");
                None
            }
            None => None,
        })
    }

    fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut values = self.read_all();
        values.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write beside the target, then rename over it
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&values)?)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            SchemaError::Store(format!("cannot replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

/// Compares the latest snapshot against the last recorded version
#[derive(Debug)]
pub struct ChangeTracker<S> {
    store: S,
    key: String,
    snapshot_dir: Option<PathBuf>,
    selector: VersionSelector,
}

impl<S: KeyValueStore> ChangeTracker<S> {
    pub fn new(store: S, snapshot_dir: impl Into<PathBuf>, selector: VersionSelector) -> Self {
        Self {
            store,
            key: DEFAULT_VERSION_KEY.to_string(),
            snapshot_dir: Some(snapshot_dir.into()),
            selector,
        }
    }

    /// Tracker for a project with no snapshot folder; the current version is
    /// always the selector's baseline
    pub fn baseline_only(store: S, selector: VersionSelector) -> Self {
        Self {
            store,
            key: DEFAULT_VERSION_KEY.to_string(),
            snapshot_dir: None,
            selector,
        }
    }

    /// Use a different store key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Borrow the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Latest snapshot version on disk
    pub fn current_version(&self) -> Result<SnapshotVersion> {
        match &self.snapshot_dir {
            Some(dir) => self.selector.select_latest(dir),
            None => Ok(self.selector.baseline().clone()),
        }
    }

    /// Persist `version` as the last processed version
    pub fn record_version(&mut self, version: &str) -> Result<()> {
        if SnapshotVersion::parse(version).is_err() {
            warn!(version, "recording a version that is not valid semver");
        }
        debug!(key = %self.key, version, "recording processed version");
        self.store.set_value(&self.key, version)
    }

    /// Record the current latest version and return it
    pub fn record_latest(&mut self) -> Result<SnapshotVersion> {
        let latest = self.current_version()?;
        self.record_version(&latest.version_string())?;
        Ok(latest)
    }

    /// Last version recorded, if any
    pub fn last_recorded_version(&self) -> Result<Option<String>> {
        self.store.get_value(&self.key)
    }

    /// Whether the latest snapshot is strictly newer than `last_stored_version`.
    ///
    /// An invalid `last_stored_version` is never a change.
    pub fn has_changed_since(&self, last_stored_version: &str) -> Result<bool> {
        let current = self.current_version()?;
        let changed = is_newer(&current.version_string(), last_stored_version);
        debug!(current = %current, stored = last_stored_version, changed, "compared versions");
        Ok(changed)
    }

    /// Compare against the stored version; nothing stored counts as changed
    pub fn has_changed(&self) -> Result<bool> {
        match self.last_recorded_version()? {
            Some(stored) => self.has_changed_since(&stored),
            None => Ok(true),
        }
    }
}
