//! Asset fetching (HTTP or local file system)

use std::future::Future;

use tracing::debug;

use crate::error::{Result, SyncError};

/// Retrieves raw bytes for an asset location
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, location: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Fetches `http://` and `https://` locations with reqwest and reads
/// everything else (optionally `file://`-prefixed) from disk.
#[derive(Debug, Clone, Default)]
pub struct DefaultFetcher {
    client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

impl AssetFetcher for DefaultFetcher {
    fn fetch(&self, location: &str) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let client = self.client.clone();
        let location = location.to_string();
        async move {
            if is_remote(&location) {
                debug!("Fetching {}", location);
                let response = client
                    .get(&location)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| SyncError::fetch(&location, e))?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| SyncError::fetch(&location, e))?;
                Ok(bytes.to_vec())
            } else {
                let path = location.strip_prefix("file://").unwrap_or(&location);
                debug!("Reading {}", path);
                tokio::fs::read(path)
                    .await
                    .map_err(|e| SyncError::fetch(&location, e))
            }
        }
    }
}
