//! Object-storage client.
//!
//! Public uploads keyed by user-scoped paths. The bucket layout mirrors a
//! hosted storage API: authenticated writes, anonymous public reads.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Object storage collaborator, consumed as a black box.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload bytes under `path` and return the public URL.
    async fn upload_public(&self, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String>;

    /// Public URL for an object path, whether or not it exists yet.
    fn public_url(&self, path: &str) -> String;
}

/// HTTP bucket storage client (hosted-storage REST shape).
pub struct HttpBucketStorage {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl HttpBucketStorage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Upload(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ObjectStorage for HttpBucketStorage {
    async fn upload_public(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);
        debug!(path = %path, bytes = bytes.len(), "uploading object");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", content_type)
            // Re-running a publish for the same path overwrites, never duplicates
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Upload(format!("HTTP {}: {}", status, detail)));
        }

        let public = self.public_url(path);
        info!(url = %public, "object uploaded");
        Ok(public)
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}
