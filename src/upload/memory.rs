//! In-process storage backend

use super::{encode_path, StorageBackend, StorageError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// A stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Keeps uploads in memory; useful for previews and tests
pub struct MemoryStore {
    base_url: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    /// Copy of everything stored so far, keyed by path
    pub fn objects(&self) -> BTreeMap<String, StoredObject> {
        self.objects.lock().clone()
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.objects.lock().insert(
            path.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), encode_path(path))
    }
}
