//! Remote asset materialization
//!
//! Downloads assets referenced by nodes into a content-addressed cache and
//! hands back references usable as edge targets.

pub mod cache;
pub mod fetcher;
pub mod materializer;

pub use cache::{AssetCache, AssetReference, FILE_NODE_TYPE};
pub use fetcher::{AssetFetcher, FetchedAsset, HttpAssetFetcher};
pub use materializer::{AssetMaterializer, AssetRule, AssetStats};
