//! Upload sink

use super::{StorageBackend, StorageError};
use crate::capture::CapturedAudio;
use crate::config::UploadConfig;
use crate::recorder::OwnerId;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

/// A capture could not be persisted
#[derive(Error, Debug)]
#[error("upload of {path} failed: {source}")]
pub struct UploadFailure {
    pub path: String,
    #[source]
    pub source: StorageError,
}

/// Storage path for a recording: `{prefix}{owner}_{timestamp}.{ext}`
pub fn recording_path(
    prefix: &str,
    owner_id: &OwnerId,
    timestamp_ms: i64,
    extension: &str,
) -> String {
    format!("{}{}_{}.{}", prefix, owner_id, timestamp_ms, extension)
}

/// Append a cache-busting query parameter
fn cache_busted(url: &str, param: &str, token: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, separator, param, token)
}

pub struct UploadSink {
    backend: Arc<dyn StorageBackend>,
    config: UploadConfig,
}

impl UploadSink {
    pub fn new(backend: Arc<dyn StorageBackend>, config: UploadConfig) -> Self {
        Self { backend, config }
    }

    /// Store a capture and return its cache-busted URL
    pub async fn put(
        &self,
        owner_id: &OwnerId,
        audio: &CapturedAudio,
    ) -> Result<String, UploadFailure> {
        let timestamp = Utc::now().timestamp_millis();
        let path = recording_path(
            &self.config.path_prefix,
            owner_id,
            timestamp,
            audio.format.extension(),
        );

        tracing::info!("Uploading {} bytes to {}", audio.len(), path);
        self.backend
            .put(&path, &audio.bytes, audio.format.content_type())
            .await
            .map_err(|source| UploadFailure {
                path: path.clone(),
                source,
            })?;

        let url = cache_busted(
            &self.backend.public_url(&path),
            &self.config.cache_bust_param,
            timestamp,
        );
        tracing::info!("Upload complete: {}", url);
        Ok(url)
    }
}
