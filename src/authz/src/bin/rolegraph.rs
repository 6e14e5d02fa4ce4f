//! # rolegraph
//!
//! Command-line inspection of a persisted role graph.
//!
//! ## Commands
//!
//! - `effective <role>` - Effective permission names
//! - `check <role> <permission>...` - Exit 0 only if every permission is held
//! - `explain <role>` - Direct vs inherited permissions with sources
//! - `tree` - Inheritance forest
//! - `matrix` - Role × permission matrix
//! - `validate` - Load the snapshot and report its size
//!
//! Roles may be given by id or by name.
//!
//! ## Configuration
//!
//! - `--config` / `ROLEGRAPH_CONFIG` - TOML engine configuration
//! - `--snapshot` / `ROLEGRAPH_SNAPSHOT` - JSON snapshot (overrides the config)
//! - `RUST_LOG` - Log filter (default: the configured log level)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rolegraph_authz::{EngineConfig, JsonFileStore, PersistentRbac, RbacReader};
use rolegraph_core::RoleId;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

/// Role graph inspection CLI
#[derive(Parser)]
#[command(name = "rolegraph")]
#[command(about = "Inspect hierarchical role-permission graphs")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "ROLEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the JSON snapshot (overrides config)
    #[arg(short, long, env = "ROLEGRAPH_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a role's effective permissions
    Effective {
        /// Role id or name
        role: String,
    },

    /// Check that a role holds every listed permission
    Check {
        /// Role id or name
        role: String,

        /// Permission names
        #[arg(required = true)]
        permissions: Vec<String>,
    },

    /// Show where each of a role's permissions comes from
    Explain {
        /// Role id or name
        role: String,
    },

    /// Print the inheritance forest as JSON
    Tree,

    /// Print the role × permission matrix as JSON
    Matrix,

    /// Load the snapshot and report its contents
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let log_level = if cli.verbose { "debug" } else { config.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let snapshot_path = cli
        .snapshot
        .clone()
        .or_else(|| config.snapshot_path.clone())
        .context("No snapshot given: pass --snapshot or set snapshot_path in the config")?;

    debug!("Loading snapshot from {}", snapshot_path.display());
    let rbac = PersistentRbac::from_config(JsonFileStore::new(&snapshot_path), &config)
        .await
        .with_context(|| format!("Failed to load role graph from {}", snapshot_path.display()))?;
    let engine = rbac.engine();

    match cli.command {
        Command::Effective { role } => {
            let role = resolve_role(engine, &role)?;
            for name in engine.effective_permission_names(role)? {
                println!("{}", name);
            }
        }

        Command::Check { role, permissions } => {
            let role = resolve_role(engine, &role)?;
            let mut missing = Vec::new();
            for permission in &permissions {
                if !engine.has_permission(role, permission)? {
                    missing.push(permission.as_str());
                }
            }

            if !missing.is_empty() {
                bail!("{} lacks: {}", role, missing.join(", "));
            }
            println!("{} holds all {} permissions", role, permissions.len());
        }

        Command::Explain { role } => {
            let role = resolve_role(engine, &role)?;
            print_json(&engine.role_permission_detail(role)?)?;
        }

        Command::Tree => print_json(&engine.hierarchy_tree())?,

        Command::Matrix => print_json(&engine.permission_matrix())?,

        Command::Validate => {
            let snapshot = engine.snapshot();
            info!("Snapshot {} is valid", snapshot_path.display());
            println!(
                "OK: {} roles, {} permissions, {} grants, {} edges",
                snapshot.roles.len(),
                snapshot.permissions.len(),
                snapshot.role_permissions.len(),
                snapshot.role_hierarchy.len()
            );
        }
    }

    Ok(())
}

/// Accept a numeric id or a role name
fn resolve_role(engine: RbacReader<'_>, input: &str) -> Result<RoleId> {
    if let Ok(id) = input.parse::<u64>() {
        return Ok(RoleId::new(id));
    }

    engine
        .role_by_name(input)
        .map(|role| role.id)
        .with_context(|| format!("Unknown role: {}", input))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", json);
    Ok(())
}
