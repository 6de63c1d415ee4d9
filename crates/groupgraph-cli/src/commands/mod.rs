//! CLI command definitions and handlers.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use groupgraph_core::settings::DEFAULT_SETTINGS_FILE;
use groupgraph_graph::{GraphClient, GraphConfig};

pub mod graph;
pub mod groups;
pub mod settings;
pub mod sync;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Sync GroupMe groups, members and messages into a Neo4j graph
#[derive(Parser)]
#[command(name = "groupgraph")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the settings file
    #[arg(short, long, global = true, env = "GROUPGRAPH_SETTINGS", default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(flatten)]
    pub neo4j: Neo4jArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Neo4j connection options.
#[derive(Args, Clone)]
pub struct Neo4jArgs {
    /// Neo4j bolt URI
    #[arg(long, global = true, env = "NEO4J_URI", default_value = "bolt://localhost:7687")]
    pub neo4j_uri: String,

    /// Neo4j user
    #[arg(long, global = true, env = "NEO4J_USER", default_value = "neo4j")]
    pub neo4j_user: String,

    /// Neo4j password
    #[arg(long, global = true, env = "NEO4J_PASSWORD", default_value = "", hide_env_values = true)]
    pub neo4j_password: String,

    /// Neo4j database
    #[arg(long, global = true, env = "NEO4J_DB", default_value = "neo4j")]
    pub neo4j_db: String,
}

impl Neo4jArgs {
    pub fn config(&self) -> GraphConfig {
        GraphConfig {
            uri: self.neo4j_uri.clone(),
            user: self.neo4j_user.clone(),
            password: self.neo4j_password.clone(),
            db: self.neo4j_db.clone(),
        }
    }

    /// Connect, giving up after [`CONNECT_TIMEOUT`].
    pub async fn connect(&self) -> Result<GraphClient> {
        let config = self.config();
        tokio::time::timeout(CONNECT_TIMEOUT, GraphClient::connect(&config))
            .await
            .with_context(|| format!("Timed out connecting to Neo4j at {}", config.uri))?
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sync every group, member and message into the graph
    Sync(sync::SyncArgs),

    /// Backfill relationships whose endpoints arrived late
    Reconcile,

    /// Create graph constraints and indexes
    Schema,

    /// Show graph status
    Status,

    /// List GroupMe groups
    Groups(groups::GroupsArgs),

    /// Manage the settings file
    #[command(subcommand)]
    Settings(settings::SettingsCommands),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Sync(args) => sync::execute(args, &self.settings, &self.neo4j).await,
            Commands::Reconcile => graph::reconcile(&self.neo4j).await,
            Commands::Schema => graph::schema(&self.neo4j).await,
            Commands::Status => graph::status(&self.neo4j).await,
            Commands::Groups(args) => groups::execute(args, &self.settings).await,
            Commands::Settings(cmd) => settings::execute(cmd, &self.settings),
        }
    }
}
