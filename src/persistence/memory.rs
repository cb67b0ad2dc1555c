use super::{PersistenceError, RecordingStore};
use crate::recorder::OwnerId;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Recording lists kept in memory
#[derive(Default)]
pub struct MemoryRecordingStore {
    lists: RwLock<HashMap<OwnerId, Vec<String>>>,
}

impl MemoryRecordingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordingStore for MemoryRecordingStore {
    async fn append_recording(
        &self,
        owner_id: &OwnerId,
        url: &str,
    ) -> Result<(), PersistenceError> {
        let mut lists = self.lists.write();
        let list = lists.entry(owner_id.clone()).or_default();
        if !list.iter().any(|existing| existing == url) {
            list.push(url.to_string());
        }
        Ok(())
    }

    async fn remove_recording(
        &self,
        owner_id: &OwnerId,
        url: &str,
    ) -> Result<(), PersistenceError> {
        if let Some(list) = self.lists.write().get_mut(owner_id) {
            list.retain(|existing| existing != url);
        }
        Ok(())
    }

    async fn recordings(&self, owner_id: &OwnerId) -> Result<Vec<String>, PersistenceError> {
        Ok(self.lists.read().get(owner_id).cloned().unwrap_or_default())
    }
}
