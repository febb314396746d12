//! `content-sync sync`

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;
use std::time::Instant;

use crate::cli::SyncArgs;
use crate::config::Config;
use crate::plugin::SourcePlugin;
use crate::store::{MemoryNodeStore, NodeRegistry, SqliteNodeStore};

/// Apply command-line overrides on top of the loaded config
fn apply_args(config: &mut Config, args: &SyncArgs) {
    if let Some(endpoint) = &args.endpoint {
        config.source.endpoint = endpoint.clone();
    }
    if args.offline {
        config.source.offline = true;
    }
    // Dry runs write nothing, including the asset cache
    if args.no_assets || args.dry {
        config.assets.enabled = false;
    }
}

pub async fn handle_sync_command(args: SyncArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load(config_path)?;
    apply_args(&mut config, &args);

    let plugin = SourcePlugin::from_config(config)?;
    plugin.on_pre_init();

    let database = plugin.config().database_path();
    let start = Instant::now();

    if args.dry {
        // Read existing nodes for link resolution, but never create the database
        let store: Box<dyn NodeRegistry> = if database.exists() {
            Box::new(SqliteNodeStore::open(&database).await?)
        } else {
            Box::new(MemoryNodeStore::new())
        };

        let plan = plugin.plan(store.as_ref()).await?;
        println!(
            "{}",
            serde_json::to_string_pretty(&plan.nodes).context("Failed to format planned nodes")?
        );
        eprintln!(
            "{} {} nodes planned, {} records skipped ({:.2}ms)",
            "Dry run:".bright_yellow().bold(),
            plan.nodes.len(),
            plan.skipped.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        return Ok(());
    }

    let store = SqliteNodeStore::open(&database).await?;
    let report = plugin.source_nodes(&store).await?;

    println!(
        "{} {}",
        "Synced".bright_green().bold(),
        plugin.config().source.namespace.cyan()
    );
    println!("  {:<16}{}", "created", report.created.to_string().bright_green());
    println!("  {:<16}{}", "updated", report.updated.to_string().bright_blue());
    println!("  {:<16}{}", "unchanged", report.unchanged.to_string().dimmed());
    if plugin.assets().is_some() {
        println!("  {:<16}{}", "assets linked", report.assets_linked);
        if report.assets_missing > 0 {
            println!(
                "  {:<16}{}",
                "assets missing",
                report.assets_missing.to_string().yellow()
            );
        }
    }
    if !report.skipped.is_empty() {
        println!("  {:<16}{}", "skipped", report.skipped.len().to_string().yellow());
        for failure in &report.skipped {
            println!("    {} {}", "-".yellow(), failure);
        }
    }
    println!(
        "  {:<16}{:.2}ms",
        "total time",
        start.elapsed().as_secs_f64() * 1000.0
    );
    println!("  {:<16}{}", "database", database.display().to_string().dimmed());

    Ok(())
}
