//! Configuration management
//!
//! Two layers:
//!
//! - [`ResolverConfig`]: how this tool behaves, loaded from defaults, a config
//!   file (`coffee.toml`) and environment variables (`COFFEE__*`).
//! - [`ProjectConfig`]: the scaffolded project's own `coffee-cli.json`, which
//!   names the designer snapshot folder. Its absence means "not configured".
//!
//! ## Example config file (coffee.toml):
//! ```toml
//! [project]
//! dir = "."
//! config_file = "coffee-cli.json"
//!
//! [snapshots]
//! baseline_version = "1.1.0"
//!
//! [state]
//! version_key = "lastProcessedVersion"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Result, SchemaError};
use crate::tracker::{JsonFileStore, DEFAULT_VERSION_KEY};
use crate::version::{SnapshotVersion, VersionSelector, BASELINE_VERSION};

/// Main configuration for the resolver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub project: ProjectSettings,

    #[serde(default)]
    pub snapshots: SnapshotSettings,

    #[serde(default)]
    pub state: StateSettings,
}

/// Where to find the scaffolded project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Project root (relative paths resolve against the working directory)
    #[serde(default = "default_project_dir")]
    pub dir: PathBuf,

    /// Project config file name inside `dir`
    #[serde(default = "default_project_config_file")]
    pub config_file: String,
}

/// Snapshot lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    /// Overrides `architecture.designer` from the project config
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Version reported when no snapshot exists
    #[serde(default = "default_baseline_version")]
    pub baseline_version: String,
}

/// Change-tracking state settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSettings {
    /// Store file; defaults to the shared temp-dir location
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Key the last processed version is stored under
    #[serde(default = "default_version_key")]
    pub version_key: String,
}

// Default value functions
fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_project_config_file() -> String {
    "coffee-cli.json".to_string()
}

fn default_baseline_version() -> String {
    BASELINE_VERSION.to_string()
}

fn default_version_key() -> String {
    DEFAULT_VERSION_KEY.to_string()
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            dir: default_project_dir(),
            config_file: default_project_config_file(),
        }
    }
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            directory: None,
            baseline_version: default_baseline_version(),
        }
    }
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            store_path: None,
            version_key: default_version_key(),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["coffee.toml", ".coffee.toml", "config/coffee.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "coffee", "coffee-cli") {
            let xdg_config = config_dir.config_dir().join("coffee.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // COFFEE__SNAPSHOTS__DIRECTORY=... etc.
        builder = builder.add_source(
            Environment::with_prefix("COFFEE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }

    /// Project root (resolves relative paths)
    pub fn project_dir(&self) -> PathBuf {
        absolutize(&self.project.dir)
    }

    /// Version selector with the configured baseline
    pub fn selector(&self) -> Result<VersionSelector> {
        let baseline = self.snapshots.baseline_version.parse::<SnapshotVersion>()?;
        Ok(VersionSelector::new(baseline))
    }

    /// State store at the configured or default location
    pub fn store(&self) -> JsonFileStore {
        match &self.state.store_path {
            Some(path) => JsonFileStore::new(absolutize(path)),
            None => JsonFileStore::default(),
        }
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    }
}

/// Contents of a project's `coffee-cli.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub architecture: ArchitectureConfig,

    /// Directory the config was read from
    #[serde(skip)]
    root: PathBuf,
}

/// Folder layout of a scaffolded project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub project_type: String,
    #[serde(default)]
    pub webapi: String,
    #[serde(default)]
    pub application: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub infrastructure: String,
    #[serde(default)]
    pub test: String,
    /// Designer history folder holding `<version>.json` snapshots
    #[serde(default)]
    pub designer: Option<String>,
}

impl ProjectConfig {
    /// Read `file_name` from `dir`; `Ok(None)` when the file does not exist
    pub fn discover(dir: &Path, file_name: &str) -> Result<Option<Self>> {
        let path = dir.join(file_name);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut config: ProjectConfig =
            serde_json::from_str(&content).map_err(|e| SchemaError::ProjectConfig {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        config.root = dir.to_path_buf();
        Ok(Some(config))
    }

    /// Directory the project config lives in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot directory, resolved against the project root
    pub fn snapshot_dir(&self) -> Option<PathBuf> {
        let designer = self.architecture.designer.as_deref()?.trim();
        if designer.is_empty() {
            return None;
        }
        Some(self.root.join(designer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.project.config_file, "coffee-cli.json");
        assert_eq!(config.state.version_key, "lastProcessedVersion");
        assert_eq!(config.selector().unwrap().baseline().version_string(), "1.1.0");
    }

    #[test]
    fn test_serialize_config() {
        let config = ResolverConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[project]"));
        assert!(toml_str.contains("[snapshots]"));
        assert!(toml_str.contains("[state]"));
    }

    #[test]
    fn test_invalid_baseline_is_rejected() {
        let mut config = ResolverConfig::default();
        config.snapshots.baseline_version = "one".to_string();
        assert!(matches!(config.selector(), Err(SchemaError::InvalidVersion(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            "[snapshots]\nbaseline_version = \"0.1.0\"\n\n[state]\nversion_key = \"designer\"\n",
        )
        .unwrap();

        let config = ResolverConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.snapshots.baseline_version, "0.1.0");
        assert_eq!(config.state.version_key, "designer");
        assert_eq!(config.project.config_file, "coffee-cli.json");
    }

    #[test]
    fn test_load_missing_explicit_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = ResolverConfig::load_from(path.to_str()).unwrap_err();
        assert!(matches!(err, SchemaError::Config(_)));
    }

    #[test]
    fn test_discover_missing_project_config() {
        let dir = tempdir().unwrap();
        assert!(ProjectConfig::discover(dir.path(), "coffee-cli.json").unwrap().is_none());
    }

    #[test]
    fn test_discover_project_config() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("coffee-cli.json"),
            r#"{"architecture":{"name":"Shop","type":"dotnetcore","infrastructure":"Shop.Infrastructure","designer":"designer-history"}}"#,
        )
        .unwrap();

        let config = ProjectConfig::discover(dir.path(), "coffee-cli.json").unwrap().unwrap();
        assert_eq!(config.architecture.name, "Shop");
        assert_eq!(config.architecture.project_type, "dotnetcore");
        assert_eq!(config.snapshot_dir(), Some(dir.path().join("designer-history")));
    }

    #[test]
    fn test_malformed_project_config() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("coffee-cli.json"), "{\"architecture\": 5}").unwrap();

        let err = ProjectConfig::discover(dir.path(), "coffee-cli.json").unwrap_err();
        assert!(matches!(err, SchemaError::ProjectConfig { .. }));
    }
}
