//! Schema Resolver CLI
//!
//! Inspects a project's designer snapshots.
//!
//! Usage:
//!   schema-resolver latest
//!   schema-resolver resolve --format dot -o schema.dot
//!   schema-resolver changed
//!   schema-resolver record

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use coffee_schemas::{ResolveOutcome, ResolverConfig, SchemaResolver, SnapshotVersion};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-resolver")]
#[command(about = "Resolve designer snapshots into an annotated schema graph")]
struct Cli {
    /// Project root containing coffee-cli.json
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Extra config file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Read snapshots from this folder instead of the project's designer folder
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the latest snapshot version
    Latest {
        /// Print the migration name instead of the version
        #[arg(long)]
        migration: bool,
    },

    /// Resolve the latest snapshot and print the schema graph
    Resolve {
        /// Output format: json or dot
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report whether the designer changed since the last recorded version
    Changed {
        /// Compare against this version instead of the stored one
        #[arg(long)]
        since: Option<String>,
    },

    /// Record a version (default: the latest) as processed
    Record {
        #[arg(long)]
        version: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ResolverConfig::load_from(cli.config.as_deref()).context("loading config")?;
    if let Some(project) = cli.project {
        config.project.dir = project;
    }
    if let Some(dir) = cli.snapshot_dir {
        config.snapshots.directory = Some(dir);
    }

    let resolver = SchemaResolver::from_config(&config)?;

    match cli.command {
        Command::Latest { migration } => {
            let Some(version) = resolver.latest_version()? else {
                return not_configured(&config);
            };
            if migration {
                println!("{}", version.migration_name());
            } else {
                println!("{}", version);
            }
        }

        Command::Resolve { format, output } => {
            let snapshot = match resolver.resolve()? {
                ResolveOutcome::NotConfigured => return not_configured(&config),
                ResolveOutcome::NoSnapshotDirectory(dir) => {
                    match dir {
                        Some(dir) => println!("No designer history folder at {:?}", dir),
                        None => println!("Project config does not name a designer folder"),
                    }
                    return Ok(());
                }
                ResolveOutcome::Resolved(snapshot) => snapshot,
            };

            if snapshot.graph.is_empty() {
                eprintln!("There are no class tables in snapshot {}", snapshot.version);
            }

            let content = match format.as_str() {
                "json" => serde_json::to_string_pretty(&snapshot.graph)?,
                "dot" => snapshot.graph.to_dot(),
                _ => bail!("Invalid format '{}'. Use 'json' or 'dot'", format),
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {:?}", path))?;
                    println!(
                        "✅ Snapshot {}: {} tables ({} join) written to {:?}",
                        snapshot.version,
                        snapshot.graph.table_count(),
                        snapshot.graph.join_tables().count(),
                        path
                    );
                }
                None => println!("{}", content),
            }
        }

        Command::Changed { since } => {
            let Some(tracker) = resolver.change_tracker(config.store())? else {
                return not_configured(&config);
            };
            let changed = match since {
                Some(stored) => tracker.has_changed_since(&stored)?,
                None => tracker.has_changed()?,
            };
            println!("{}", changed);
        }

        Command::Record { version } => {
            let Some(mut tracker) = resolver.change_tracker(config.store())? else {
                return not_configured(&config);
            };
            let recorded = match version {
                Some(version) => {
                    let parsed: SnapshotVersion = version.parse()?;
                    tracker.record_version(&parsed.version_string())?;
                    parsed
                }
                None => tracker.record_latest()?,
            };
            println!("✅ Recorded {} as processed", recorded);
        }
    }

    Ok(())
}

fn not_configured(config: &ResolverConfig) -> anyhow::Result<()> {
    println!(
        "Couldn't find the {} file in {:?}",
        config.project.config_file,
        config.project_dir()
    );
    Ok(())
}
