//! `content-sync schema`

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::schema::SchemaDefinition;

pub fn handle_schema_command(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    let schema = if config.assets.enabled && !config.source.offline {
        SchemaDefinition::source_schema(&config.assets.link_field)
    } else {
        SchemaDefinition::without_assets()
    };

    print!("{}", schema.to_sdl());
    Ok(())
}
