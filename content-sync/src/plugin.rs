//! Source plugin handle
//!
//! Owns everything a sync needs: the content source, the synchronizer, the
//! schema and (optionally) the asset materializer. Built once from [`Config`]
//! and passed by reference into [`SourcePlugin::source_nodes`].

use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;

use crate::api::resilience::ConcurrencyLimiter;
use crate::api::{ContentSource, GraphqlClient, GraphqlSource, OfflineSource};
use crate::config::{APP_NAME, Config};
use crate::error::SyncError;
use crate::nodes::NodeIdFactory;
use crate::schema::SchemaDefinition;
use crate::services::assets::{AssetCache, AssetMaterializer, HttpAssetFetcher};
use crate::services::sync::{PassPlan, PassReport, SyncPass, Synchronizer};
use crate::store::NodeRegistry;

pub struct SourcePlugin {
    config: Config,
    source: Box<dyn ContentSource>,
    synchronizer: Synchronizer,
    schema: SchemaDefinition,
    assets: Option<AssetMaterializer>,
}

impl SourcePlugin {
    /// Build the plugin and its transports from configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let resilience = config.resilience()?;
        let ids = NodeIdFactory::new(&config.source.namespace);

        let source: Box<dyn ContentSource> = if config.source.offline {
            Box::new(OfflineSource)
        } else {
            let endpoint = config.endpoint_url()?;
            let client = GraphqlClient::new(endpoint, &resilience)
                .context("Failed to build GraphQL client")?;
            Box::new(GraphqlSource::new(client))
        };

        let assets = if config.assets.enabled && !config.source.offline {
            let fetcher = HttpAssetFetcher::new(resilience.timeouts.asset)
                .context("Failed to build asset HTTP client")?;
            Some(AssetMaterializer::new(
                config.asset_rule(),
                Arc::new(fetcher),
                AssetCache::new(config.cache_dir()),
                ConcurrencyLimiter::new(resilience.concurrency.clone()),
                resilience.timeouts.asset,
                ids,
            ))
        } else {
            None
        };

        Ok(Self::with_parts(config, source, assets))
    }

    /// Assemble a plugin from already-built parts
    pub fn with_parts(
        config: Config,
        source: Box<dyn ContentSource>,
        assets: Option<AssetMaterializer>,
    ) -> Self {
        let synchronizer = Synchronizer::new(config.source.namespace.clone());
        let schema = match &assets {
            Some(assets) => SchemaDefinition::source_schema(&assets.rule().link_field),
            None => SchemaDefinition::without_assets(),
        };

        debug!(
            "Plugin ready: {}, assets {}",
            source.describe(),
            if assets.is_some() { "enabled" } else { "disabled" }
        );

        Self {
            config,
            source,
            synchronizer,
            schema,
            assets,
        }
    }

    pub fn on_pre_init(&self) {
        info!("Loaded {}", APP_NAME);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    pub fn assets(&self) -> Option<&AssetMaterializer> {
        self.assets.as_ref()
    }

    fn pass(&self) -> SyncPass<'_> {
        SyncPass::new(self.source.as_ref(), &self.synchronizer, &self.schema)
            .with_assets(self.assets.as_ref())
    }

    /// Run one pass and register its nodes in `registry`
    pub async fn source_nodes(&self, registry: &dyn NodeRegistry) -> Result<PassReport, SyncError> {
        self.pass().run(registry).await
    }

    /// Build the nodes of one pass without registering them
    pub async fn plan(&self, registry: &dyn NodeRegistry) -> Result<PassPlan, SyncError> {
        self.pass().plan(registry).await
    }
}
