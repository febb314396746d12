//! Asset materializer - fetch-and-cache of remote assets referenced by nodes
//!
//! Failures never propagate: a node whose asset cannot be obtained simply has
//! no asset edge. Calls for the same URL are serialized on a per-URL slot, so
//! at most one download per URL is ever in flight.

use futures::future::join_all;
use log::{debug, warn};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::cache::{AssetCache, AssetReference, FILE_NODE_TYPE};
use super::fetcher::AssetFetcher;
use crate::api::resilience::ConcurrencyLimiter;
use crate::nodes::{GraphNode, NodeCreationRequest, NodeIdFactory};

/// Which nodes carry an external asset, and where
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRule {
    /// Node type that carries the asset (e.g., "Post")
    pub type_name: String,
    /// Field holding the asset URL (e.g., "imgUrl")
    pub url_field: String,
    /// Edge name pointing at the file node (e.g., "remoteImage")
    pub link_field: String,
}

impl Default for AssetRule {
    fn default() -> Self {
        Self {
            type_name: "Post".to_string(),
            url_field: "imgUrl".to_string(),
            link_field: "remoteImage".to_string(),
        }
    }
}

/// Counters since the materializer was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetStats {
    /// Requests served from the cache
    pub hits: u64,
    /// Network downloads started
    pub fetches: u64,
    /// Requests that ended without an asset after trying
    pub failures: u64,
}

type Slot = Arc<Mutex<Option<AssetReference>>>;

pub struct AssetMaterializer {
    rule: AssetRule,
    fetcher: Arc<dyn AssetFetcher>,
    cache: AssetCache,
    limiter: ConcurrencyLimiter,
    timeout: Duration,
    ids: NodeIdFactory,
    slots: Mutex<HashMap<String, Slot>>,
    hits: AtomicU64,
    fetches: AtomicU64,
    failures: AtomicU64,
}

impl AssetMaterializer {
    pub fn new(
        rule: AssetRule,
        fetcher: Arc<dyn AssetFetcher>,
        cache: AssetCache,
        limiter: ConcurrencyLimiter,
        timeout: Duration,
        ids: NodeIdFactory,
    ) -> Self {
        Self {
            rule,
            fetcher,
            cache,
            limiter,
            timeout,
            ids,
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn rule(&self) -> &AssetRule {
        &self.rule
    }

    pub fn stats(&self) -> AssetStats {
        AssetStats {
            hits: self.hits.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Materialize the asset of every request concurrently
    ///
    /// Results line up with `requests`.
    pub async fn materialize_all(
        &self,
        requests: &[NodeCreationRequest],
    ) -> Vec<Option<AssetReference>> {
        join_all(requests.iter().map(|r| self.materialize(&r.node))).await
    }

    /// Fetch (or reuse) the asset a node points at
    pub async fn materialize(&self, node: &GraphNode) -> Option<AssetReference> {
        if node.type_name() != self.rule.type_name {
            return None;
        }

        let Some(raw_url) = node.str_field(&self.rule.url_field) else {
            debug!("Node {} has no {}", node.id, self.rule.url_field);
            return None;
        };

        let url = match Url::parse(raw_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                warn!("Node {}: unsupported asset scheme '{}'", node.id, url.scheme());
                self.failures.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(e) => {
                warn!("Node {}: invalid asset URL '{}': {}", node.id, raw_url, e);
                self.failures.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let slot = self.slot(url.as_str()).await;
        let mut cached = slot.lock().await;

        if let Some(existing) = cached.as_ref() {
            if self.cache.is_valid(existing).await {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(existing.clone());
            }
        }

        if let Some(mut on_disk) = self.cache.lookup(url.as_str()).await {
            // The cache directory may be shared by several sources
            on_disk.id = self.ids.node_id(FILE_NODE_TYPE, url.as_str());
            self.hits.fetch_add(1, Ordering::Relaxed);
            *cached = Some(on_disk.clone());
            return Some(on_disk);
        }

        let reference = self.download(&url, node).await;
        if reference.is_none() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        *cached = reference.clone();
        reference
    }

    async fn download(&self, url: &Url, node: &GraphNode) -> Option<AssetReference> {
        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!("Node {}: cannot schedule download of {}: {}", node.id, url, e);
                return None;
            }
        };

        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!("Downloading {} for node {}", url, node.id);

        let asset = match tokio::time::timeout(self.timeout, self.fetcher.fetch(url)).await {
            Ok(Ok(asset)) => asset,
            Ok(Err(e)) => {
                warn!("Node {}: asset unavailable: {}", node.id, e);
                return None;
            }
            Err(_) => {
                warn!("Node {}: fetching {} timed out after {:?}", node.id, url, self.timeout);
                return None;
            }
        };

        let id = self.ids.node_id(FILE_NODE_TYPE, url.as_str());
        match self.cache.store(url, id, asset).await {
            Ok(reference) => Some(reference),
            Err(e) => {
                warn!("Node {}: could not cache {}: {}", node.id, url, e);
                None
            }
        }
    }

    async fn slot(&self, url: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(url.to_string()).or_default())
    }
}
