//! Configuration loaded from `config.toml`
//!
//! Every key is optional. A missing file means all defaults. A few values can
//! be overridden from the environment (and `.env`):
//!
//! - `CONTENT_SYNC_ENDPOINT` -> `source.endpoint`
//! - `CONTENT_SYNC_CACHE_DIR` -> `assets.cache_dir`
//! - `CONTENT_SYNC_DATABASE` -> `store.database`

use anyhow::{Context, Result, bail};
use log::debug;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::resilience::{ResilienceConfig, ResilienceConfigBuilder};
use crate::services::assets::AssetRule;

pub const APP_NAME: &str = "content-sync";

/// Endpoint used by the `local` preset
pub const LOCAL_ENDPOINT: &str = "http://localhost:4000";
/// Endpoint used by the `hosted` preset
pub const HOSTED_ENDPOINT: &str = "https://gatsby-source-plugin-api.glitch.me/";

pub const ENV_ENDPOINT: &str = "CONTENT_SYNC_ENDPOINT";
pub const ENV_CACHE_DIR: &str = "CONTENT_SYNC_CACHE_DIR";
pub const ENV_DATABASE: &str = "CONTENT_SYNC_DATABASE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub assets: AssetsConfig,
    pub resilience: ResilienceSettings,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// `local`, `hosted`, or a full URL
    pub endpoint: String,
    /// Fetch nothing and register nothing
    pub offline: bool,
    /// Namespace of node ids and owner of registered nodes
    pub namespace: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "local".to_string(),
            offline: false,
            namespace: APP_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub enabled: bool,
    pub entity_type: String,
    pub url_field: String,
    pub link_field: String,
    pub cache_dir: Option<PathBuf>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        let rule = AssetRule::default();
        Self {
            enabled: true,
            entity_type: rule.type_name,
            url_field: rule.url_field,
            link_field: rule.link_field,
            cache_dir: None,
        }
    }
}

/// `[resilience]`: a named profile plus optional overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub profile: String,
    pub query_timeout_ms: Option<u64>,
    pub asset_timeout_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub max_concurrent_downloads: Option<usize>,
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            query_timeout_ms: None,
            asset_timeout_ms: None,
            max_attempts: None,
            max_concurrent_downloads: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database: Option<PathBuf>,
}

impl Config {
    /// `<config_dir>/content-sync/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
    }

    /// Load from `path` (or the default location), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };

        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                debug!("Loaded config from {}", path.display());
                Self::from_toml(&raw)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            Some(path) => {
                debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse config")
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.source.endpoint = endpoint;
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.assets.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(db) = lookup(ENV_DATABASE) {
            self.store.database = Some(PathBuf::from(db));
        }
    }

    /// Resolve the endpoint preset or URL
    pub fn endpoint_url(&self) -> Result<Url> {
        resolve_endpoint(&self.source.endpoint)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.assets.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("assets")
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.store.database.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("nodes.db")
        })
    }

    pub fn asset_rule(&self) -> AssetRule {
        AssetRule {
            type_name: self.assets.entity_type.clone(),
            url_field: self.assets.url_field.clone(),
            link_field: self.assets.link_field.clone(),
        }
    }

    /// Build the resilience config from the profile and overrides
    pub fn resilience(&self) -> Result<ResilienceConfig> {
        let settings = &self.resilience;
        let Some(base) = ResilienceConfig::profile(&settings.profile) else {
            bail!(
                "Unknown resilience profile '{}' (expected default, conservative, development or disabled)",
                settings.profile
            );
        };

        let mut builder = ResilienceConfigBuilder::from_config(base);
        if let Some(ms) = settings.query_timeout_ms {
            builder = builder.query_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = settings.asset_timeout_ms {
            builder = builder.asset_timeout(Duration::from_millis(ms));
        }
        if let Some(attempts) = settings.max_attempts {
            if attempts == 0 {
                bail!("resilience.max_attempts must be at least 1");
            }
            builder = builder.max_retries(attempts);
        }
        if let Some(max) = settings.max_concurrent_downloads {
            builder = builder.max_concurrent_downloads(max);
        }

        Ok(builder.build())
    }
}

/// Map `local` / `hosted` to their URLs; anything else must be an http(s) URL
pub fn resolve_endpoint(endpoint: &str) -> Result<Url> {
    let raw = match endpoint.trim() {
        "local" => LOCAL_ENDPOINT,
        "hosted" => HOSTED_ENDPOINT,
        other => other,
    };

    let url = Url::parse(raw).with_context(|| format!("Invalid endpoint '{}'", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Endpoint '{}' must use http or https", raw);
    }
    Ok(url)
}
