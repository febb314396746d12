//! `content-sync nodes`

use anyhow::{Context, Result, bail};
use colored::*;
use std::path::Path;

use crate::cli::NodesArgs;
use crate::config::Config;
use crate::nodes::GraphNode;
use crate::records::EntityType;
use crate::services::assets::FILE_NODE_TYPE;
use crate::store::{NodeRegistry, SqliteNodeStore};

pub async fn handle_nodes_command(args: NodesArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let database = config.database_path();

    if !database.exists() {
        bail!(
            "No node database at {}. Run 'content-sync sync' first.",
            database.display()
        );
    }

    let store = SqliteNodeStore::open(&database).await?;
    let nodes = list_nodes(&store, args.type_name.as_deref()).await?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&nodes).context("Failed to format nodes")?
        );
        return Ok(());
    }

    if nodes.is_empty() {
        println!("{}", "No nodes registered".dimmed());
        return Ok(());
    }

    for node in &nodes {
        println!(
            "{}  {:<8} {}  {}",
            node.id.to_string().cyan(),
            node.type_name().bold(),
            short_digest(node).dimmed(),
            label(node)
        );
    }
    println!();
    println!("{} nodes", nodes.len().to_string().bright_green());

    Ok(())
}

/// Nodes of `type_name`, or of every known type
async fn list_nodes(registry: &dyn NodeRegistry, type_name: Option<&str>) -> Result<Vec<GraphNode>> {
    let types: Vec<&str> = match type_name {
        Some(name) => vec![name],
        None => EntityType::ALL
            .iter()
            .map(|t| t.type_name())
            .chain([FILE_NODE_TYPE])
            .collect(),
    };

    let mut nodes = Vec::new();
    for name in types {
        nodes.extend(registry.nodes_by_type(name).await?);
    }
    Ok(nodes)
}

fn short_digest(node: &GraphNode) -> String {
    node.digest().as_str().chars().take(12).collect()
}

/// Most descriptive field available for display
fn label(node: &GraphNode) -> String {
    ["slug", "name", "url", "description"]
        .iter()
        .find_map(|field| node.str_field(field))
        .unwrap_or("")
        .to_string()
}
