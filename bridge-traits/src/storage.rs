//! Key-Value Storage Abstraction
//!
//! Provides the platform-agnostic contract for durable, process-wide
//! key-value persistence with string keys and string values.

use async_trait::async_trait;

use crate::error::Result;

/// Durable key-value storage trait
///
/// Abstracts platform-specific key-value persistence:
/// - iOS/Android: AsyncStorage-style preferences files or SQLite
/// - Desktop: SQLite-backed table
/// - Tests: in-process maps
///
/// Values are opaque strings; callers that need structure serialize before
/// writing. A single `set_item` replaces the whole value for its key and is
/// atomic with respect to other calls on the same key.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn remember(store: &dyn KeyValueStore) -> Result<()> {
///     store.set_item("@genre_rock", "[]").await?;
///     let keys = store.list_keys().await?;
///     assert!(keys.contains(&"@genre_rock".to_string()));
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve the value stored under `key`
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`
    ///
    /// Removing a key that does not exist is not an error.
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// List every key currently stored
    ///
    /// Ordering is implementation-defined.
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Check if a key exists without retrieving it
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_item(key).await?.is_some())
    }

    /// Fetch several keys at once
    ///
    /// The default implementation issues one `get_item` per key; adapters
    /// with a batch primitive should override it.
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>> {
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self.get_item(key).await?;
            entries.push((key.clone(), value));
        }
        Ok(entries)
    }
}
