//! Schema Resolver
//!
//! Runs the full pipeline for a project: find the snapshot folder, select the
//! latest snapshot, read it, classify and resolve it into a [`SchemaGraph`].

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::checksum::Checksum;
use crate::config::{ProjectConfig, ResolverConfig};
use crate::error::Result;
use crate::graph::SchemaGraph;
use crate::snapshot::{SnapshotRead, SnapshotStore};
use crate::tracker::{ChangeTracker, KeyValueStore};
use crate::version::{SnapshotVersion, VersionSelector};

/// Outcome of resolving a project's latest snapshot
#[derive(Debug)]
pub enum ResolveOutcome {
    /// No project config file was found
    NotConfigured,
    /// The snapshot folder does not exist (or the config names none)
    NoSnapshotDirectory(Option<PathBuf>),
    /// A snapshot was selected; its graph may be empty
    Resolved(ResolvedSnapshot),
}

impl ResolveOutcome {
    /// The resolved snapshot, if there is one
    pub fn resolved(self) -> Option<ResolvedSnapshot> {
        match self {
            ResolveOutcome::Resolved(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

/// Where a project's snapshot files are expected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotLocation {
    /// No project config file
    NotConfigured,
    /// The project config names no designer folder
    Unset,
    /// Snapshot folder path (may not exist yet)
    Directory(PathBuf),
}

/// The enriched graph of one snapshot
#[derive(Debug)]
pub struct ResolvedSnapshot {
    pub version: SnapshotVersion,
    pub checksum: Option<Checksum>,
    pub graph: SchemaGraph,
}

/// Resolves the latest snapshot of a project
#[derive(Debug, Clone)]
pub struct SchemaResolver {
    project_dir: PathBuf,
    config_file: String,
    snapshot_dir_override: Option<PathBuf>,
    version_key: String,
    selector: VersionSelector,
}

impl SchemaResolver {
    /// Resolver for the project in `project_dir` using default settings
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let config = ResolverConfig::default();
        Self {
            project_dir: project_dir.into(),
            config_file: config.project.config_file,
            snapshot_dir_override: None,
            version_key: config.state.version_key,
            selector: VersionSelector::default(),
        }
    }

    /// Resolver driven by loaded configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        Ok(Self {
            project_dir: config.project_dir(),
            config_file: config.project.config_file.clone(),
            snapshot_dir_override: config.snapshots.directory.clone(),
            version_key: config.state.version_key.clone(),
            selector: config.selector()?,
        })
    }

    /// Read snapshots from `dir` regardless of the project config
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir_override = Some(dir.into());
        self
    }

    pub fn with_selector(mut self, selector: VersionSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn selector(&self) -> &VersionSelector {
        &self.selector
    }

    /// Where this project's snapshots live
    pub fn locate(&self) -> Result<SnapshotLocation> {
        if let Some(dir) = &self.snapshot_dir_override {
            let dir = if dir.is_absolute() {
                dir.clone()
            } else {
                self.project_dir.join(dir)
            };
            return Ok(SnapshotLocation::Directory(dir));
        }

        let Some(project) = ProjectConfig::discover(&self.project_dir, &self.config_file)? else {
            return Ok(SnapshotLocation::NotConfigured);
        };
        Ok(match project.snapshot_dir() {
            Some(dir) => SnapshotLocation::Directory(dir),
            None => SnapshotLocation::Unset,
        })
    }

    /// Latest snapshot version, or `None` when not configured
    pub fn latest_version(&self) -> Result<Option<SnapshotVersion>> {
        match self.locate()? {
            SnapshotLocation::NotConfigured => Ok(None),
            SnapshotLocation::Unset => Ok(Some(self.selector.baseline().clone())),
            SnapshotLocation::Directory(dir) => self.selector.select_latest(&dir).map(Some),
        }
    }

    /// Resolve the latest snapshot into a schema graph
    pub fn resolve(&self) -> Result<ResolveOutcome> {
        let dir = match self.locate()? {
            SnapshotLocation::NotConfigured => {
                debug!(project = %self.project_dir.display(), "project not configured");
                return Ok(ResolveOutcome::NotConfigured);
            }
            SnapshotLocation::Unset => return Ok(ResolveOutcome::NoSnapshotDirectory(None)),
            SnapshotLocation::Directory(dir) => dir,
        };

        let store = SnapshotStore::new(&dir);
        let snapshot = match store.load_latest(&self.selector)? {
            SnapshotRead::MissingDirectory => {
                return Ok(ResolveOutcome::NoSnapshotDirectory(Some(dir)));
            }
            SnapshotRead::Tables(snapshot) => snapshot,
        };

        let graph = SchemaGraph::from_tables(snapshot.tables);
        info!(
            version = %snapshot.version,
            tables = graph.table_count(),
            join_tables = graph.join_tables().count(),
            "resolved schema graph"
        );

        Ok(ResolveOutcome::Resolved(ResolvedSnapshot {
            version: snapshot.version,
            checksum: snapshot.checksum,
            graph,
        }))
    }

    /// Change tracker over this project's snapshot folder.
    ///
    /// `Ok(None)` when the project is not configured. A project without a
    /// designer folder tracks against the baseline.
    pub fn change_tracker<S: KeyValueStore>(&self, store: S) -> Result<Option<ChangeTracker<S>>> {
        let tracker = match self.locate()? {
            SnapshotLocation::NotConfigured => return Ok(None),
            SnapshotLocation::Unset => ChangeTracker::baseline_only(store, self.selector.clone()),
            SnapshotLocation::Directory(dir) => ChangeTracker::new(store, dir, self.selector.clone()),
        };
        Ok(Some(tracker.with_key(self.version_key.clone())))
    }
}
