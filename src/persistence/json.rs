//! JSON file backed recording lists
//!
//! The whole map is rewritten on every change. Writes go to a sibling file
//! first and are renamed into place.

use super::{PersistenceError, RecordingStore};
use crate::recorder::OwnerId;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type Lists = BTreeMap<OwnerId, Vec<String>>;

pub struct JsonRecordingStore {
    path: PathBuf,
    lists: Mutex<Option<Lists>>,
}

impl JsonRecordingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lists: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> Result<Lists, PersistenceError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Lists::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&self, lists: &Lists) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(lists)?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, content).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    /// Apply `change` to a copy of the loaded map and persist it if it
    /// reports a change
    ///
    /// The cache only takes the new map once it is on disk, so a failed write
    /// leaves the previous state for the next attempt.
    async fn update<F>(&self, change: F) -> Result<(), PersistenceError>
    where
        F: FnOnce(&mut Lists) -> bool + Send,
    {
        let mut guard = self.lists.lock().await;
        let current = match guard.take() {
            Some(lists) => lists,
            None => self.read_file().await?,
        };

        let mut next = current.clone();
        if !change(&mut next) {
            *guard = Some(current);
            return Ok(());
        }

        match self.write_file(&next).await {
            Ok(()) => {
                *guard = Some(next);
                Ok(())
            }
            Err(e) => {
                *guard = Some(current);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl RecordingStore for JsonRecordingStore {
    async fn append_recording(
        &self,
        owner_id: &OwnerId,
        url: &str,
    ) -> Result<(), PersistenceError> {
        self.update(|lists| {
            let list = lists.entry(owner_id.clone()).or_default();
            if list.iter().any(|existing| existing == url) {
                return false;
            }
            list.push(url.to_string());
            true
        })
        .await?;
        tracing::debug!("Recorded {} for {}", url, owner_id);
        Ok(())
    }

    async fn remove_recording(
        &self,
        owner_id: &OwnerId,
        url: &str,
    ) -> Result<(), PersistenceError> {
        self.update(|lists| {
            let Some(list) = lists.get_mut(owner_id) else {
                return false;
            };
            let before = list.len();
            list.retain(|existing| existing != url);
            if list.is_empty() {
                lists.remove(owner_id);
                return true;
            }
            list.len() != before
        })
        .await
    }

    async fn recordings(&self, owner_id: &OwnerId) -> Result<Vec<String>, PersistenceError> {
        let mut guard = self.lists.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        Ok(guard
            .as_ref()
            .and_then(|lists| lists.get(owner_id).cloned())
            .unwrap_or_default())
    }
}
