//! Command-line interface

pub mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Source posts and authors from a GraphQL API into a content node graph
#[derive(Parser, Debug)]
#[command(name = "content-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default `env_logger` filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one sync pass against the node database
    Sync(SyncArgs),

    /// Print the declared node schema
    Schema,

    /// List registered nodes
    Nodes(NodesArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Endpoint preset (local, hosted) or GraphQL URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Fetch nothing and register nothing
    #[arg(long)]
    pub offline: bool,

    /// Skip remote asset materialization
    #[arg(long)]
    pub no_assets: bool,

    /// Print the planned nodes as JSON instead of registering them (implies --no-assets)
    #[arg(long)]
    pub dry: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct NodesArgs {
    /// Only list nodes of this type (e.g., Post, Author, File)
    #[arg(long = "type", value_name = "TYPE")]
    pub type_name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Sync(args) => commands::sync::handle_sync_command(args, config_path).await,
        Commands::Schema => commands::schema::handle_schema_command(config_path),
        Commands::Nodes(args) => commands::nodes::handle_nodes_command(args, config_path).await,
    }
}
