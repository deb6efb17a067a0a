//! # Core Configuration Module
//!
//! Provides configuration management for the genre library core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the bridges and settings the library needs. It enforces
//! fail-fast validation so a host learns about a missing capability at
//! startup rather than on the first save.
//!
//! ## Required Dependencies
//!
//! - `KeyValueStore` - Durable storage for genre buckets. Either injected, or
//!   opened from `database_path` by the desktop shims.
//!
//! ## Optional Dependencies
//!
//! - `Clock` - Time source used for song id generation (default: system clock)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .key_value_store(Arc::new(MyStore))
//!     .serialize_writes(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, KeyValueStore, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

/// Key prefix reserved for genre buckets in the backing store.
pub const DEFAULT_GENRE_KEY_PREFIX: &str = "@genre_";

/// Upper bound for the event bus buffer.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// What to do with a song whose artist is missing or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingArtistPolicy {
    /// Store the song under the placeholder artist "Unknown Artist".
    #[default]
    Substitute,
    /// Refuse the save with a validation error.
    Reject,
}

/// Behavioral settings for the genre library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySettings {
    /// Prefix that marks a backing-store key as a genre bucket.
    pub key_prefix: String,
    /// Serialize read-modify-write cycles per genre with an async mutex.
    pub serialize_writes: bool,
    pub missing_artist: MissingArtistPolicy,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_GENRE_KEY_PREFIX.to_string(),
            serialize_writes: true,
            missing_artist: MissingArtistPolicy::default(),
        }
    }
}

impl LibrarySettings {
    pub fn validate(&self) -> Result<()> {
        if self.key_prefix.is_empty() {
            return Err(Error::Config("Genre key prefix cannot be empty".to_string()));
        }

        if self.key_prefix.trim() != self.key_prefix {
            return Err(Error::Config(
                "Genre key prefix cannot start or end with whitespace".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration for the genre library.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database used when no store is injected
    pub database_path: Option<PathBuf>,

    /// Injected backing store (takes precedence over `database_path`)
    pub key_value_store: Option<Arc<dyn KeyValueStore>>,

    /// Time source for id generation
    pub clock: Arc<dyn Clock>,

    pub library: LibrarySettings,

    /// Capacity of the library event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field(
                "key_value_store",
                &self
                    .key_value_store
                    .as_ref()
                    .map(|_| "KeyValueStore { ... }"),
            )
            .field("clock", &"Clock { ... }")
            .field("library", &self.library)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - A backing store is injected or can be opened from a database path
    /// - The database path, when given, is not empty
    /// - Library settings are well-formed
    /// - The event buffer size is within bounds
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if self.key_value_store.is_none() && self.database_path.is_none() {
            return Err(key_value_store_missing_error());
        }

        self.library.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}

fn key_value_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "KeyValueStore".to_string(),
        message: "A KeyValueStore is required to persist genre buckets. \
                 Desktop: enable the 'desktop-shims' feature or set .database_path(). \
                 Mobile: inject the platform-native key-value storage adapter."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn default_database_path() -> Option<PathBuf> {
    bridge_desktop::default_database_path()
}

#[cfg(not(feature = "desktop-shims"))]
fn default_database_path() -> Option<PathBuf> {
    None
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    key_value_store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    library: LibrarySettings,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the SQLite database path used by the desktop store.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Injects the backing key-value store.
    ///
    /// Mobile hosts pass their native adapter here; tests pass an
    /// in-memory store.
    pub fn key_value_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store = Some(store);
        self
    }

    /// Sets the time source used for id generation.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Overrides the genre key prefix.
    ///
    /// Default: `@genre_`
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.library.key_prefix = prefix.into();
        self
    }

    /// Enables or disables per-genre write serialization.
    ///
    /// Default: true
    pub fn serialize_writes(mut self, enabled: bool) -> Self {
        self.library.serialize_writes = enabled;
        self
    }

    /// Sets the policy for songs saved without an artist.
    ///
    /// Default: [`MissingArtistPolicy::Substitute`]
    pub fn missing_artist(mut self, policy: MissingArtistPolicy) -> Self {
        self.library.missing_artist = policy;
        self
    }

    /// Sets all library settings at once.
    pub fn library(mut self, settings: LibrarySettings) -> Self {
        self.library = settings;
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - No store is injected and no database path is available
    /// - Configuration values are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = match (&self.key_value_store, self.database_path) {
            (_, Some(path)) => Some(path),
            (Some(_), None) => None,
            (None, None) => default_database_path(),
        };

        let config = CoreConfig {
            database_path,
            key_value_store: self.key_value_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            library: self.library,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
