//! Genre song store trait and key-value implementation
//!
//! Each normalized genre owns one key (`<prefix><genre>`) whose value is the
//! JSON array of its songs. The key exists exactly while the array is
//! non-empty; the genre list is the set of prefixed keys.

use crate::error::{LibraryError, Result};
use crate::models::{
    normalize_genre, GenreBucket, SaveOutcome, Song, SongCandidate, SongKey, SongRef,
};
use async_trait::async_trait;
use bridge_traits::{Clock, KeyValueStore};
use core_runtime::config::{CoreConfig, LibrarySettings};
use core_runtime::events::{EventBus, LibraryEvent};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument, warn};

/// Genre song store interface shared by every host screen
#[async_trait]
pub trait GenreSongStore: Send + Sync {
    /// Append a song to the bucket for `genre`
    ///
    /// # Returns
    /// - `SaveOutcome::Saved` with the stored record
    /// - `SaveOutcome::Duplicate` with the existing record when the bucket
    ///   already holds the same `(title, artist)`; nothing is written
    ///
    /// # Errors
    /// Returns error if:
    /// - `genre` is blank or the song has no title
    /// - The backing store fails or the bucket is unreadable
    async fn save(&self, genre: &str, song: SongCandidate) -> Result<SaveOutcome>;

    /// Songs stored under `genre`, in the order they were saved
    ///
    /// Unknown and blank genres yield an empty list.
    async fn list_by_genre(&self, genre: &str) -> Result<Vec<Song>>;

    /// Normalized names of every genre holding at least one song
    async fn list_genres(&self) -> Result<Vec<String>>;

    /// Remove the first song in `genre` matching `song`
    ///
    /// Removing the last song removes the genre.
    ///
    /// # Returns
    /// - `Ok(true)` if a song was removed
    /// - `Ok(false)` if nothing matched
    async fn delete_song(&self, genre: &str, song: &SongRef) -> Result<bool>;

    /// Every stored bucket with its songs
    async fn snapshot(&self) -> Result<Vec<GenreBucket>>;

    /// Remove every genre bucket, leaving unrelated keys alone
    ///
    /// # Returns
    /// Number of buckets removed
    async fn clear(&self) -> Result<usize>;
}

/// Per-genre async locks serializing read-modify-write cycles.
///
/// An entry lives only while some task holds or waits for it.
#[derive(Default)]
struct GenreLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl GenreLocks {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn acquire(&self, genre: &str) -> GenreGuard<'_> {
        let lock = Arc::clone(self.entries().entry(genre.to_string()).or_default());
        let guard = lock.lock_owned().await;

        GenreGuard {
            locks: self,
            genre: genre.to_string(),
            guard: Some(guard),
        }
    }

    /// Drop the entry for `genre` once nobody else references it.
    fn release(&self, genre: &str) {
        let mut entries = self.entries();
        let unused = entries
            .get(genre)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if unused {
            entries.remove(genre);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries().len()
    }
}

/// Holds one genre's lock; prunes the lock map when dropped.
struct GenreGuard<'a> {
    locks: &'a GenreLocks,
    genre: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for GenreGuard<'_> {
    fn drop(&mut self) {
        // The owned guard keeps an Arc alive; release it before counting.
        self.guard.take();
        self.locks.release(&self.genre);
    }
}

/// `GenreSongStore` backed by a host `KeyValueStore`
pub struct KvGenreSongStore {
    backend: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    settings: LibrarySettings,
    events: Option<EventBus>,
    locks: GenreLocks,
}

impl KvGenreSongStore {
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        settings: LibrarySettings,
    ) -> Self {
        Self {
            backend,
            clock,
            settings,
            events: None,
            locks: GenreLocks::default(),
        }
    }

    /// Build a store from validated configuration and an opened backend.
    pub fn from_config(config: &CoreConfig, backend: Arc<dyn KeyValueStore>) -> Self {
        Self::new(backend, Arc::clone(&config.clock), config.library.clone())
    }

    /// Publish change notifications on `events`.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn settings(&self) -> &LibrarySettings {
        &self.settings
    }

    fn bucket_key(&self, genre: &str) -> String {
        format!("{}{}", self.settings.key_prefix, genre)
    }

    fn genre_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.settings.key_prefix.as_str())
    }

    fn emit(&self, event: LibraryEvent) {
        if let Some(events) = &self.events {
            // No subscribers is fine
            events.emit(event).ok();
        }
    }

    async fn lock_genre(&self, genre: &str) -> Option<GenreGuard<'_>> {
        if self.settings.serialize_writes {
            Some(self.locks.acquire(genre).await)
        } else {
            None
        }
    }

    fn require_genre(genre: &str) -> Result<String> {
        match normalize_genre(Some(genre)) {
            Some(normalized) if !normalized.is_empty() => Ok(normalized),
            _ => Err(LibraryError::validation("genre", "Genre name is required")),
        }
    }

    async fn load_bucket(&self, key: &str) -> Result<Vec<Song>> {
        let raw = self.backend.get_item(key).await.map_err(|err| {
            error!(key, error = %err, "Failed to read genre bucket");
            LibraryError::from(err)
        })?;

        match raw {
            Some(raw) => decode_bucket(key, &raw),
            None => Ok(Vec::new()),
        }
    }

    async fn store_bucket(&self, key: &str, songs: &[Song]) -> Result<()> {
        let value = serde_json::to_string(songs).map_err(|source| LibraryError::Encoding {
            key: key.to_string(),
            source,
        })?;

        self.backend.set_item(key, &value).await.map_err(|err| {
            error!(key, error = %err, "Failed to write genre bucket");
            LibraryError::from(err)
        })
    }

    async fn genre_keys(&self) -> Result<Vec<String>> {
        let keys = self.backend.list_keys().await.map_err(|err| {
            error!(error = %err, "Failed to enumerate stored keys");
            LibraryError::from(err)
        })?;

        Ok(keys
            .into_iter()
            .filter(|key| self.genre_from_key(key).is_some())
            .collect())
    }

    /// Id for a new song, unique within `bucket`.
    fn assign_id(
        &self,
        requested: Option<&str>,
        title: &str,
        artist: &str,
        bucket: &[Song],
    ) -> String {
        let taken = |id: &str| bucket.iter().any(|song| song.id == id);

        if let Some(id) = requested.map(str::trim).filter(|id| !id.is_empty()) {
            if !taken(id) {
                return id.to_string();
            }
            warn!(id, "Upstream id already used in genre, generating a new one");
        }

        let base = format!("{}-{}-{}", title, artist, self.clock.unix_timestamp_millis());
        let mut id = base.clone();
        let mut suffix = 1;
        while taken(&id) {
            id = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        id
    }
}

fn decode_bucket(key: &str, raw: &str) -> Result<Vec<Song>> {
    serde_json::from_str(raw).map_err(|source| {
        error!(key, error = %source, "Genre bucket is not a song list");
        LibraryError::CorruptBucket {
            key: key.to_string(),
            source,
        }
    })
}

impl fmt::Debug for KvGenreSongStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvGenreSongStore")
            .field("settings", &self.settings)
            .field("events", &self.events)
            .finish()
    }
}

#[async_trait]
impl GenreSongStore for KvGenreSongStore {
    #[instrument(skip(self, song), fields(genre = %genre))]
    async fn save(&self, genre: &str, song: SongCandidate) -> Result<SaveOutcome> {
        let normalized = Self::require_genre(genre)?;
        let (title, artist) = song.resolve_identity(self.settings.missing_artist)?;
        let key = self.bucket_key(&normalized);

        let _guard = self.lock_genre(&normalized).await;
        let mut bucket = self.load_bucket(&key).await?;

        let identity = SongKey::new(&title, &artist);
        if let Some(existing) = bucket.iter().find(|stored| stored.key() == identity) {
            info!(genre = %normalized, title = %title, artist = %artist, "Duplicate song not saved");
            self.emit(LibraryEvent::DuplicateRejected {
                genre: normalized,
                title,
                artist,
            });
            return Ok(SaveOutcome::Duplicate(existing.clone()));
        }

        let id = self.assign_id(song.id.as_deref(), &title, &artist, &bucket);
        let stored = Song {
            id,
            title,
            artist,
            genre: genre.to_string(),
            album_cover: song.album_cover,
            preview: song.preview,
            deezer_link: song.deezer_link,
            spotify_link: song.spotify_link,
        };

        bucket.push(stored.clone());
        self.store_bucket(&key, &bucket).await?;

        debug!(genre = %normalized, song_id = %stored.id, count = bucket.len(), "Saved song");
        self.emit(LibraryEvent::SongSaved {
            genre: normalized,
            song_id: stored.id.clone(),
            title: stored.title.clone(),
            artist: stored.artist.clone(),
        });

        Ok(SaveOutcome::Saved(stored))
    }

    #[instrument(skip(self), fields(genre = %genre))]
    async fn list_by_genre(&self, genre: &str) -> Result<Vec<Song>> {
        let normalized = match normalize_genre(Some(genre)) {
            Some(normalized) if !normalized.is_empty() => normalized,
            _ => return Ok(Vec::new()),
        };

        self.load_bucket(&self.bucket_key(&normalized)).await
    }

    #[instrument(skip(self))]
    async fn list_genres(&self) -> Result<Vec<String>> {
        let genres: Vec<String> = self
            .genre_keys()
            .await?
            .iter()
            .filter_map(|key| self.genre_from_key(key))
            .map(str::to_string)
            .collect();

        debug!(count = genres.len(), "Listed genres");
        Ok(genres)
    }

    #[instrument(skip(self), fields(genre = %genre))]
    async fn delete_song(&self, genre: &str, song: &SongRef) -> Result<bool> {
        let normalized = Self::require_genre(genre)?;
        let key = self.bucket_key(&normalized);

        let _guard = self.lock_genre(&normalized).await;
        let mut bucket = self.load_bucket(&key).await?;

        let Some(position) = bucket.iter().position(|stored| song.matches(stored)) else {
            debug!(genre = %normalized, "No matching song to delete");
            return Ok(false);
        };
        let removed = bucket.remove(position);

        if bucket.is_empty() {
            self.backend.remove_item(&key).await.map_err(|err| {
                error!(key = %key, error = %err, "Failed to remove empty genre bucket");
                LibraryError::from(err)
            })?;
            info!(genre = %normalized, "Deleted genre because it had no songs");
        } else {
            self.store_bucket(&key, &bucket).await?;
            debug!(genre = %normalized, remaining = bucket.len(), "Updated genre bucket");
        }

        self.emit(LibraryEvent::SongDeleted {
            genre: normalized.clone(),
            song_id: removed.id,
        });
        if bucket.is_empty() {
            self.emit(LibraryEvent::GenreRemoved { genre: normalized });
        }

        Ok(true)
    }

    #[instrument(skip(self))]
    async fn snapshot(&self) -> Result<Vec<GenreBucket>> {
        let keys = self.genre_keys().await?;
        let entries = self.backend.multi_get(&keys).await?;

        let mut buckets = Vec::with_capacity(entries.len());
        for (key, raw) in entries {
            // Removed between enumeration and read
            let Some(raw) = raw else { continue };
            let Some(genre) = self.genre_from_key(&key) else { continue };

            buckets.push(GenreBucket {
                genre: genre.to_string(),
                songs: decode_bucket(&key, &raw)?,
            });
        }

        debug!(buckets = buckets.len(), "Captured library snapshot");
        Ok(buckets)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<usize> {
        let keys = self.genre_keys().await?;

        for key in &keys {
            let genre = self.genre_from_key(key).unwrap_or_default();
            let _guard = self.lock_genre(genre).await;
            self.backend.remove_item(key).await.map_err(|err| {
                error!(key = %key, error = %err, "Failed to remove genre bucket");
                LibraryError::from(err)
            })?;
        }

        info!(genres_removed = keys.len(), "Cleared genre library");
        self.emit(LibraryEvent::LibraryCleared {
            genres_removed: keys.len(),
        });

        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use bridge_traits::error::BridgeError;
    use bridge_traits::SystemClock;
    use mockall::mock;

    mock! {
        pub Backend {}

        #[async_trait]
        impl KeyValueStore for Backend {
            async fn get_item(&self, key: &str) -> bridge_traits::error::Result<Option<String>>;
            async fn set_item(&self, key: &str, value: &str) -> bridge_traits::error::Result<()>;
            async fn remove_item(&self, key: &str) -> bridge_traits::error::Result<()>;
            async fn list_keys(&self) -> bridge_traits::error::Result<Vec<String>>;
        }
    }

    fn store_with(backend: MockBackend) -> KvGenreSongStore {
        KvGenreSongStore::new(
            Arc::new(backend),
            Arc::new(SystemClock),
            LibrarySettings::default(),
        )
    }

    fn bucket_json(songs: &[(&str, &str, &str)]) -> String {
        let songs: Vec<Song> = songs
            .iter()
            .map(|(id, title, artist)| Song {
                id: id.to_string(),
                title: title.to_string(),
                artist: artist.to_string(),
                genre: "rock".to_string(),
                album_cover: None,
                preview: None,
                deezer_link: None,
                spotify_link: None,
            })
            .collect();
        serde_json::to_string(&songs).unwrap()
    }

    #[tokio::test]
    async fn test_save_read_failure_is_storage_error() {
        let mut backend = MockBackend::new();
        backend
            .expect_get_item()
            .returning(|_| Err(BridgeError::DatabaseError("disk I/O error".into())));
        backend.expect_set_item().never();

        let store = store_with(backend);
        let err = store
            .save("Rock", SongCandidate::new("Song A", "Artist X"))
            .await
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Storage);
    }

    #[tokio::test]
    async fn test_save_write_failure_is_propagated() {
        let mut backend = MockBackend::new();
        backend
            .expect_get_item()
            .withf(|key| key == "@genre_rock")
            .returning(|_| Ok(None));
        backend.expect_set_item().times(1).returning(|key, _| {
            Err(BridgeError::QuotaExceeded {
                key: key.to_string(),
            })
        });

        let store = store_with(backend);
        let err = store
            .save("Rock", SongCandidate::new("Song A", "Artist X"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LibraryError::Storage(BridgeError::QuotaExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn test_validation_happens_before_storage() {
        let mut backend = MockBackend::new();
        backend.expect_get_item().never();
        backend.expect_set_item().never();

        let store = store_with(backend);

        let blank_genre = store
            .save("  ", SongCandidate::new("X", "Y"))
            .await
            .unwrap_err();
        assert!(matches!(blank_genre, LibraryError::Validation { ref field, .. } if field == "genre"));

        let blank_title = store
            .save("Rock", SongCandidate::new(" ", "Y"))
            .await
            .unwrap_err();
        assert!(matches!(blank_title, LibraryError::Validation { ref field, .. } if field == "title"));
    }

    #[tokio::test]
    async fn test_corrupt_bucket_is_reported() {
        let mut backend = MockBackend::new();
        backend
            .expect_get_item()
            .returning(|_| Ok(Some("{not json".to_string())));

        let store = store_with(backend);
        let err = store.list_by_genre("rock").await.unwrap_err();

        assert!(matches!(err, LibraryError::CorruptBucket { ref key, .. } if key == "@genre_rock"));
    }

    #[tokio::test]
    async fn test_delete_last_song_removes_key() {
        let mut backend = MockBackend::new();
        backend
            .expect_get_item()
            .withf(|key| key == "@genre_jazz")
            .returning(|_| Ok(Some(bucket_json(&[("1", "Song B", "Artist Y")]))));
        backend.expect_set_item().never();
        backend
            .expect_remove_item()
            .withf(|key| key == "@genre_jazz")
            .times(1)
            .returning(|_| Ok(()));

        let store = store_with(backend);
        assert!(store.delete_song("Jazz", &SongRef::id("1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_persists_remaining_songs() {
        let mut backend = MockBackend::new();
        backend.expect_get_item().returning(|_| {
            Ok(Some(bucket_json(&[
                ("1", "Song A", "Artist X"),
                ("2", "Song B", "Artist Y"),
            ])))
        });
        backend
            .expect_set_item()
            .withf(|key, value| key == "@genre_rock" && value.contains("Song B") && !value.contains("Song A"))
            .times(1)
            .returning(|_, _| Ok(()));
        backend.expect_remove_item().never();

        let store = store_with(backend);
        assert!(store
            .delete_song("rock", &SongRef::named("song a", "artist x"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete_remove_failure_is_propagated() {
        let mut backend = MockBackend::new();
        backend
            .expect_get_item()
            .returning(|_| Ok(Some(bucket_json(&[("1", "Song B", "Artist Y")]))));
        backend
            .expect_remove_item()
            .returning(|_| Err(BridgeError::OperationFailed("read-only".into())));

        let store = store_with(backend);
        let err = store
            .delete_song("jazz", &SongRef::id("1"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Storage);
    }

    #[tokio::test]
    async fn test_list_genres_failure_is_propagated() {
        let mut backend = MockBackend::new();
        backend
            .expect_list_keys()
            .returning(|| Err(BridgeError::NotAvailable("storage locked".into())));

        let store = store_with(backend);
        assert!(store.list_genres().await.is_err());
    }

    #[tokio::test]
    async fn test_clear_only_touches_prefixed_keys() {
        let mut backend = MockBackend::new();
        backend.expect_list_keys().returning(|| {
            Ok(vec![
                "@genre_rock".to_string(),
                "theme".to_string(),
                "@genre_jazz".to_string(),
            ])
        });
        backend
            .expect_remove_item()
            .withf(|key| key.starts_with("@genre_"))
            .times(2)
            .returning(|_| Ok(()));

        let store = store_with(backend);
        assert_eq!(store.clear().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_lock_map_is_pruned_after_use() {
        let store = KvGenreSongStore::new(
            Arc::new(bridge_desktop::MemoryKeyValueStore::new()),
            Arc::new(SystemClock),
            LibrarySettings::default(),
        );

        for i in 0..50 {
            let genre = format!("Genre {}", i);
            store
                .save(&genre, SongCandidate::new("Song A", "Artist X"))
                .await
                .unwrap();
            store
                .delete_song(&genre, &SongRef::named("Song A", "Artist X"))
                .await
                .unwrap();
            store
                .delete_song(&format!("ghost {}", i), &SongRef::id("missing"))
                .await
                .unwrap();
        }

        store.save("Rock", SongCandidate::new("A", "X")).await.unwrap();
        store.clear().await.unwrap();

        assert!(store.list_genres().await.unwrap().is_empty());
        assert_eq!(store.locks.len(), 0);
    }

    fn holders(locks: &GenreLocks, genre: &str) -> usize {
        locks
            .entries()
            .get(genre)
            .map_or(0, |lock| Arc::strong_count(lock))
    }

    #[tokio::test]
    async fn test_lock_entry_kept_while_another_task_waits() {
        let locks = Arc::new(GenreLocks::default());
        let first = locks.acquire("rock").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                drop(locks.acquire("rock").await);
            })
        };

        // Map entry, held guard and the waiter's clone
        while holders(&locks, "rock") < 3 {
            tokio::task::yield_now().await;
        }

        drop(first);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_upstream_id_collision_gets_fresh_id() {
        let mut backend = MockBackend::new();
        backend
            .expect_get_item()
            .returning(|_| Ok(Some(bucket_json(&[("42", "Song A", "Artist X")]))));
        backend.expect_set_item().returning(|_, _| Ok(()));

        let store = store_with(backend);
        let outcome = store
            .save("rock", SongCandidate::new("Song B", "Artist Y").with_id("42"))
            .await
            .unwrap();

        assert!(outcome.is_saved());
        assert_ne!(outcome.song().id, "42");
        assert!(outcome.song().id.starts_with("Song B-Artist Y-"));
    }
}
