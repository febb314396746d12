//! Remote asset download

use async_trait::async_trait;
use log::debug;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use crate::error::AssetError;

/// Bytes of a downloaded asset
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub media_type: Option<String>,
}

/// Downloads assets by URL
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedAsset, AssetError>;
}

/// HTTP(S) downloader backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    http: reqwest::Client,
}

impl HttpAssetFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("content-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedAsset, AssetError> {
        debug!("GET {}", url);

        let to_error = |e: reqwest::Error| {
            if e.is_timeout() {
                AssetError::Timeout {
                    url: url.to_string(),
                }
            } else {
                AssetError::Fetch {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let response = self.http.get(url.clone()).send().await.map_err(to_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty());

        let bytes = response.bytes().await.map_err(to_error)?;

        Ok(FetchedAsset {
            bytes: bytes.to_vec(),
            media_type,
        })
    }
}
