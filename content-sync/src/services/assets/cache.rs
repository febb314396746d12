//! Content-addressed on-disk asset cache
//!
//! Each URL maps to `<sha256(url)>.<ext>` holding the bytes and
//! `<sha256(url)>.json` holding its [`AssetReference`]. A cached copy is valid
//! only while the bytes still hash to the recorded digest.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::fetcher::FetchedAsset;
use crate::error::AssetError;
use crate::nodes::{ContentDigest, GraphNode, NodeId, NodeInternal, canonical_json};

/// Node type name of materialized assets
pub const FILE_NODE_TYPE: &str = "File";

/// A cached remote asset, usable as an edge target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetReference {
    pub id: NodeId,
    pub url: String,
    pub path: PathBuf,
    pub content_digest: ContentDigest,
    pub media_type: Option<String>,
    pub size: u64,
    pub fetched_at: DateTime<Utc>,
}

impl AssetReference {
    /// File node for this asset, parented to the node that referenced it
    pub fn to_file_node(&self, parent: NodeId, owner: &str) -> GraphNode {
        let fields: Map<String, Value> = match json!({
            "url": self.url,
            "path": self.path.to_string_lossy(),
            "mediaType": self.media_type,
            "size": self.size,
            "contentDigest": self.content_digest,
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let content = canonical_json(&Value::Object(fields.clone())).unwrap_or_default();

        GraphNode {
            id: self.id,
            parent: Some(parent),
            children: Vec::new(),
            fields,
            links: BTreeMap::new(),
            internal: NodeInternal {
                type_name: FILE_NODE_TYPE.to_string(),
                content,
                content_digest: self.content_digest.clone(),
                owner: owner.to_string(),
            },
        }
    }
}

/// Directory-backed asset cache
#[derive(Debug, Clone)]
pub struct AssetCache {
    root: PathBuf,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache key of a URL
    pub fn key_for(url: &str) -> String {
        ContentDigest::of_bytes(url.as_bytes()).to_string()
    }

    fn metadata_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    /// Check the cached bytes still match the reference
    pub async fn is_valid(&self, reference: &AssetReference) -> bool {
        match tokio::fs::read(&reference.path).await {
            Ok(bytes) => ContentDigest::of_bytes(&bytes) == reference.content_digest,
            Err(_) => false,
        }
    }

    /// Find a valid cached copy of `url`
    pub async fn lookup(&self, url: &str) -> Option<AssetReference> {
        let metadata_path = self.metadata_path(&Self::key_for(url));
        let raw = tokio::fs::read(&metadata_path).await.ok()?;

        let reference: AssetReference = match serde_json::from_slice(&raw) {
            Ok(reference) => reference,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", metadata_path.display(), e);
                return None;
            }
        };

        if reference.url != url {
            warn!("Cache entry {} belongs to {}", metadata_path.display(), reference.url);
            return None;
        }

        if self.is_valid(&reference).await {
            debug!("Cache hit for {}", url);
            Some(reference)
        } else {
            debug!("Cached copy of {} is missing or stale", url);
            None
        }
    }

    /// Write downloaded bytes and their metadata into the cache
    pub async fn store(
        &self,
        url: &Url,
        id: NodeId,
        asset: FetchedAsset,
    ) -> Result<AssetReference, AssetError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let key = Self::key_for(url.as_str());
        let path = self.root.join(format!("{}.{}", key, extension_for(url, asset.media_type.as_deref())));

        let reference = AssetReference {
            id,
            url: url.to_string(),
            path: path.clone(),
            content_digest: ContentDigest::of_bytes(&asset.bytes),
            media_type: asset.media_type,
            size: asset.bytes.len() as u64,
            fetched_at: Utc::now(),
        };

        write_atomic(&path, &asset.bytes).await?;
        write_atomic(&self.metadata_path(&key), &serde_json::to_vec_pretty(&reference)?).await?;

        debug!("Cached {} ({} bytes) at {}", url, reference.size, path.display());
        Ok(reference)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

/// File extension from the URL path, falling back to the media type
fn extension_for(url: &Url, media_type: Option<&str>) -> String {
    let from_path = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_path
        .or_else(|| {
            media_type
                .and_then(|m| m.strip_prefix("image/"))
                .map(|sub| match sub {
                    "jpeg" => "jpg".to_string(),
                    "svg+xml" => "svg".to_string(),
                    other => other.to_string(),
                })
                .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        })
        .unwrap_or_else(|| "bin".to_string())
}
