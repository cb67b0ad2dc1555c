//! Per-owner recording lists
//!
//! After a successful upload the coordinator appends the URL to its owner's
//! list. Both append and removal are idempotent so retried deliveries of the
//! same `(owner, url)` pair are harmless.

pub mod json;
pub mod memory;

pub use json::JsonRecordingStore;
pub use memory::MemoryRecordingStore;

use crate::recorder::OwnerId;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Add `url` to the owner's list unless it is already there
    async fn append_recording(&self, owner_id: &OwnerId, url: &str) -> Result<(), PersistenceError>;

    /// Remove `url` from the owner's list if present
    async fn remove_recording(&self, owner_id: &OwnerId, url: &str) -> Result<(), PersistenceError>;

    /// The owner's recordings, oldest first
    async fn recordings(&self, owner_id: &OwnerId) -> Result<Vec<String>, PersistenceError>;
}
