//! Remote object storage over HTTP

use super::{encode_path, StorageBackend, StorageError};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endpoints of the hosted object store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpStoreConfig {
    /// Objects are uploaded with `POST {upload_endpoint}/{path}`
    pub upload_endpoint: String,

    /// Objects are served from `{public_endpoint}/{path}`
    pub public_endpoint: String,

    /// Sent as `Authorization: Bearer ...` when present
    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

pub struct HttpStore {
    client: reqwest::Client,
    config: HttpStoreConfig,
}

impl HttpStore {
    pub fn new(config: HttpStoreConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn join(base: &str, path: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), encode_path(path))
    }
}

#[async_trait]
impl StorageBackend for HttpStore {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        let url = Self::join(&self.config.upload_endpoint, path);
        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes.to_vec());
        if let Some(token) = &self.config.bearer_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Uploaded {} bytes to {}", bytes.len(), url);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        Self::join(&self.config.public_endpoint, path)
    }
}
