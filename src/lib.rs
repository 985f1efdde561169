//! Coffee Schema Resolver
//!
//! Turns versioned snapshots of a designer table diagram into an enriched
//! schema graph for the code generators.
//!
//! ## Features
//!
//! - **Snapshot Selection**: Picks the highest semver `<version>.json` in the designer folder
//! - **Join Table Detection**: Tables with exactly two foreign keys are many-to-many links
//! - **Relation Resolution**: Each entity learns its join tables, each join table its two sides
//! - **Change Tracking**: Remembers the last processed version across invocations
//!
//! ## Layout
//!
//! ```text
//! project/
//! ├── coffee-cli.json          { "architecture": { "designer": "designer-history", ... } }
//! └── designer-history/
//!     ├── 1.0.0.json
//!     ├── 1.1.0.json
//!     └── 1.2.0.json           <- latest, { "data": { "classTables": [...] } }
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod graph;
pub mod resolver;
pub mod schema;
pub mod snapshot;
pub mod tracker;
pub mod version;

pub use checksum::Checksum;
pub use config::{ProjectConfig, ResolverConfig};
pub use error::{Result, SchemaError};
pub use graph::{ResolvedTable, SchemaGraph, TableKind};
pub use resolver::{ResolveOutcome, ResolvedSnapshot, SchemaResolver, SnapshotLocation};
pub use schema::{ColumnDefinition, ForeignReference, SnapshotDocument, TableDefinition};
pub use snapshot::{LoadedSnapshot, SnapshotRead, SnapshotStore};
pub use tracker::{ChangeTracker, JsonFileStore, KeyValueStore, MemoryStore};
pub use version::{SnapshotVersion, VersionSelector, BASELINE_VERSION};
