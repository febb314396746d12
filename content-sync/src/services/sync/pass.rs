//! One synchronization pass: fetch, map, materialize, link, register

use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

use super::engine::Synchronizer;
use crate::api::ContentSource;
use crate::error::{RecordError, SyncError};
use crate::nodes::GraphNode;
use crate::schema::SchemaDefinition;
use crate::services::assets::AssetMaterializer;
use crate::store::{NodeRegistry, RegisterOutcome};

/// Nodes a pass would register, before touching the store
#[derive(Debug, Clone, Default)]
pub struct PassPlan {
    /// Source nodes followed by file nodes
    pub nodes: Vec<GraphNode>,
    pub skipped: Vec<RecordError>,
    pub assets_linked: usize,
    /// Nodes that referenced an asset but ended up without one
    pub assets_missing: usize,
    pub links_resolved: usize,
}

/// What a completed pass did
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: Vec<RecordError>,
    pub assets_linked: usize,
    pub assets_missing: usize,
    pub links_resolved: usize,
}

impl PassReport {
    pub fn registered(&self) -> usize {
        self.created + self.updated + self.unchanged
    }

    fn record(&mut self, outcome: RegisterOutcome) {
        match outcome {
            RegisterOutcome::Created => self.created += 1,
            RegisterOutcome::Updated => self.updated += 1,
            RegisterOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} unchanged, {} skipped, {} assets linked, {} assets missing",
            self.created,
            self.updated,
            self.unchanged,
            self.skipped.len(),
            self.assets_linked,
            self.assets_missing
        )
    }
}

/// Borrowed view over everything a pass needs
pub struct SyncPass<'a> {
    source: &'a dyn ContentSource,
    synchronizer: &'a Synchronizer,
    schema: &'a SchemaDefinition,
    assets: Option<&'a AssetMaterializer>,
}

impl<'a> SyncPass<'a> {
    pub fn new(
        source: &'a dyn ContentSource,
        synchronizer: &'a Synchronizer,
        schema: &'a SchemaDefinition,
    ) -> Self {
        Self {
            source,
            synchronizer,
            schema,
            assets: None,
        }
    }

    pub fn with_assets(mut self, assets: Option<&'a AssetMaterializer>) -> Self {
        self.assets = assets;
        self
    }

    /// Build every node of the pass without registering any
    ///
    /// `registry` is only read, to resolve links against nodes from earlier
    /// passes. A failed query returns before anything else happens.
    pub async fn plan(&self, registry: &dyn NodeRegistry) -> Result<PassPlan, SyncError> {
        info!("Querying {}", self.source.describe());

        let batch = self.source.fetch().await.inspect_err(|e| {
            error!("Aborting pass, nothing registered: {}", e);
        })?;

        let outcome = self.synchronizer.synchronize(&batch);
        let mut requests = outcome.requests;
        let mut plan = PassPlan {
            skipped: outcome.failures,
            ..Default::default()
        };

        for request in &requests {
            for mismatch in self.schema.check_fields(request.node.type_name(), &request.node.fields) {
                warn!("{} {}: {}", request.node.type_name(), request.id(), mismatch);
            }
        }

        let mut files = Vec::new();
        if let Some(assets) = self.assets {
            let rule = assets.rule();
            let references = assets.materialize_all(&requests).await;
            let mut seen = BTreeSet::new();

            for (request, reference) in requests.iter_mut().zip(references) {
                let wants_asset = request.node.type_name() == rule.type_name
                    && request.node.str_field(&rule.url_field).is_some();

                match reference {
                    Some(reference) => {
                        request.link(rule.link_field.clone(), reference.id);
                        request.node.children.push(reference.id);
                        plan.assets_linked += 1;
                        // A file shared by several nodes is parented to the first
                        if seen.insert(reference.id) {
                            files.push(reference.to_file_node(request.id(), self.synchronizer.owner()));
                        }
                    }
                    None if wants_asset => plan.assets_missing += 1,
                    None => {}
                }
            }

            debug!("Asset stats: {:?}", assets.stats());
        }

        let mut existing = Vec::new();
        for target in self.schema.field_link_targets() {
            existing.extend(
                registry
                    .nodes_by_type(target)
                    .await
                    .map_err(SyncError::Store)?,
            );
        }
        plan.links_resolved = self.schema.resolve_links(&mut requests, &existing);

        plan.nodes = requests
            .into_iter()
            .map(|r| r.into_node())
            .chain(files)
            .collect();

        Ok(plan)
    }

    /// Run the pass and register its nodes
    pub async fn run(&self, registry: &dyn NodeRegistry) -> Result<PassReport, SyncError> {
        let start = Instant::now();
        let plan = self.plan(registry).await?;

        let mut report = PassReport {
            skipped: plan.skipped,
            assets_linked: plan.assets_linked,
            assets_missing: plan.assets_missing,
            links_resolved: plan.links_resolved,
            ..Default::default()
        };

        for node in plan.nodes {
            let id = node.id;
            let outcome = registry.register(node).await.map_err(|e| {
                error!("Failed to register node {}: {:#}", id, e);
                SyncError::Store(e)
            })?;
            debug!("Node {} {}", id, outcome);
            report.record(outcome);
        }

        info!("Sync pass finished in {:?}: {}", start.elapsed(), report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::resilience::{ConcurrencyConfig, ConcurrencyLimiter};
    use crate::error::{AssetError, QueryError};
    use crate::nodes::NodeIdFactory;
    use crate::records::{EntityType, SourceBatch};
    use crate::services::assets::{AssetCache, AssetFetcher, AssetRule, FetchedAsset, FILE_NODE_TYPE};
    use crate::store::MemoryNodeStore;
    use async_trait::async_trait;
    use reqwest::Url;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedSource(SourceBatch);

    #[async_trait]
    impl ContentSource for FixedSource {
        fn describe(&self) -> String {
            "fixed source".to_string()
        }

        async fn fetch(&self) -> Result<SourceBatch, QueryError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl ContentSource for FailingSource {
        fn describe(&self) -> String {
            "failing source".to_string()
        }

        async fn fetch(&self) -> Result<SourceBatch, QueryError> {
            Err(QueryError::Graphql(vec!["Cannot query field \"posts\"".to_string()]))
        }
    }

    /// Fails for URLs containing "missing"
    #[derive(Default)]
    struct FakeFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AssetFetcher for FakeFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedAsset, AssetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.path().contains("missing") {
                return Err(AssetError::Status {
                    url: url.to_string(),
                    status: 404,
                });
            }
            Ok(FetchedAsset {
                bytes: url.path().as_bytes().to_vec(),
                media_type: Some("image/png".to_string()),
            })
        }
    }

    fn batch() -> SourceBatch {
        SourceBatch::new()
            .with(
                EntityType::Post,
                vec![
                    json!({ "id": 1, "description": "My first post!", "imgUrl": "https://img.test/a.png",
                            "author": { "id": 1, "name": "Jay" } }),
                    json!({ "id": 2, "description": "Post number two!", "imgUrl": "https://img.test/missing.png" }),
                    json!({ "description": "no id" }),
                ],
            )
            .with(EntityType::Author, vec![json!({ "id": 1, "name": "Jay" })])
    }

    fn materializer(fetcher: Arc<FakeFetcher>, dir: &std::path::Path) -> AssetMaterializer {
        AssetMaterializer::new(
            AssetRule::default(),
            fetcher,
            AssetCache::new(dir),
            ConcurrencyLimiter::new(ConcurrencyConfig::default()),
            Duration::from_secs(5),
            NodeIdFactory::new("test"),
        )
    }

    #[tokio::test]
    async fn test_query_failure_registers_nothing() {
        let store = MemoryNodeStore::new();
        let sync = Synchronizer::new("test");
        let schema = SchemaDefinition::source_schema("remoteImage");

        let err = SyncPass::new(&FailingSource, &sync, &schema)
            .run(&store)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Query(QueryError::Graphql(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pass_without_assets() {
        let store = MemoryNodeStore::new();
        let sync = Synchronizer::new("test");
        let schema = SchemaDefinition::without_assets();
        let source = FixedSource(batch());

        let report = SyncPass::new(&source, &sync, &schema).run(&store).await.unwrap();

        assert_eq!(report.created, 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.links_resolved, 1);
        assert_eq!(report.assets_linked, 0);

        let post = store.get(&sync.ids().node_id("Post", "1")).await.unwrap().unwrap();
        assert_eq!(post.links.get("author"), Some(&sync.ids().node_id("Author", "1")));
        assert!(store.nodes_by_type(FILE_NODE_TYPE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pass_links_assets_and_degrades_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryNodeStore::new();
        let sync = Synchronizer::new("test");
        let schema = SchemaDefinition::source_schema("remoteImage");
        let source = FixedSource(batch());
        let assets = materializer(Arc::new(FakeFetcher::default()), dir.path());

        let report = SyncPass::new(&source, &sync, &schema)
            .with_assets(Some(&assets))
            .run(&store)
            .await
            .unwrap();

        assert_eq!(report.assets_linked, 1);
        assert_eq!(report.assets_missing, 1);
        // Two posts, one author, one file
        assert_eq!(report.created, 4);

        let post = store.get(&sync.ids().node_id("Post", "1")).await.unwrap().unwrap();
        let file_id = *post.links.get("remoteImage").unwrap();
        let file = store.get(&file_id).await.unwrap().unwrap();
        assert_eq!(file.type_name(), FILE_NODE_TYPE);
        assert_eq!(file.parent, Some(post.id));
        assert_eq!(post.children, vec![file_id]);

        let second = store.get(&sync.ids().node_id("Post", "2")).await.unwrap().unwrap();
        assert!(!second.links.contains_key("remoteImage"));
    }

    #[tokio::test]
    async fn test_second_pass_is_unchanged_and_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryNodeStore::new();
        let sync = Synchronizer::new("test");
        let schema = SchemaDefinition::source_schema("remoteImage");
        let source = FixedSource(batch());
        let fetcher = Arc::new(FakeFetcher::default());
        let assets = materializer(Arc::clone(&fetcher), dir.path());
        let pass = SyncPass::new(&source, &sync, &schema).with_assets(Some(&assets));

        pass.run(&store).await.unwrap();
        let calls_after_first = fetcher.calls.load(Ordering::SeqCst);
        let report = pass.run(&store).await.unwrap();

        assert_eq!(report.created, 0);
        assert_eq!(report.updated, 0);
        assert_eq!(report.unchanged, 4);
        // Only the failed URL is tried again
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), calls_after_first + 1);
    }

    #[tokio::test]
    async fn test_author_link_resolves_against_store() {
        let store = MemoryNodeStore::new();
        let sync = Synchronizer::new("test");
        let schema = SchemaDefinition::without_assets();

        let authors = FixedSource(
            SourceBatch::new().with(EntityType::Author, vec![json!({ "id": 7, "name": "Kay" })]),
        );
        SyncPass::new(&authors, &sync, &schema).run(&store).await.unwrap();

        let posts = FixedSource(SourceBatch::new().with(
            EntityType::Post,
            vec![json!({ "id": 1, "author": { "name": "Kay" } })],
        ));
        let plan = SyncPass::new(&posts, &sync, &schema).plan(&store).await.unwrap();

        assert_eq!(plan.links_resolved, 1);
        assert_eq!(
            plan.nodes[0].links.get("author"),
            Some(&sync.ids().node_id("Author", "7"))
        );
        // Planning does not register
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
