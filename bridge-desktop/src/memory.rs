//! In-process key-value store
//!
//! Keeps everything in a map behind an async lock. Nothing survives the
//! process; used by tests and by hosts that want an ephemeral library.

use async_trait::async_trait;
use bridge_traits::{error::Result, storage::KeyValueStore};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::trace;

/// Map-backed [`KeyValueStore`]. Keys enumerate in lexicographic order.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        trace!(key = key, "Stored value in memory");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .map(|key| (key.clone(), entries.get(key).cloned()))
            .collect())
    }
}
