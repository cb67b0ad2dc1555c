//! Upload of finished captures
//!
//! [`UploadSink`] names and stores a capture through a [`StorageBackend`]
//! and hands back a cache-busted public URL.

pub mod http;
pub mod local;
pub mod memory;
pub mod sink;

pub use http::{HttpStore, HttpStoreConfig};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use sink::{recording_path, UploadFailure, UploadSink};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage rejected upload ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid storage path: {0}")]
    InvalidPath(String),
}

/// Durable object storage consumed by the upload sink
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Publicly addressable URL of an object, without cache busting
    fn public_url(&self, path: &str) -> String;
}

/// Percent-encode each segment of a `/`-separated path
pub(crate) fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
