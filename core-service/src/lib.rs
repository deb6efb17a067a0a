//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] and the host-provided bridges
//! into a ready genre library. Desktop apps typically enable the
//! `desktop-shims` feature, which opens an SQLite-backed key-value store when
//! none is injected. Mobile hosts inject their native key-value adapter
//! through the config builder.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{Clock, KeyValueStore};
use core_library::{GenreSongStore, KvGenreSongStore};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, LibraryEvent, Receiver};
use tracing::info;

/// Aggregated handle to the bridge dependencies the core requires.
pub struct CoreDependencies {
    pub key_value_store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(key_value_store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            key_value_store,
            clock,
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    deps: Arc<CoreDependencies>,
    library: Arc<KvGenreSongStore>,
    events: EventBus,
}

impl CoreService {
    /// Create a service over an already opened backing store.
    pub fn new(config: &CoreConfig, key_value_store: Arc<dyn KeyValueStore>) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        let library = KvGenreSongStore::from_config(config, Arc::clone(&key_value_store))
            .with_event_bus(events.clone());

        Self {
            deps: Arc::new(CoreDependencies::new(
                key_value_store,
                Arc::clone(&config.clock),
            )),
            library: Arc::new(library),
            events,
        }
    }

    /// Open the backing store described by `config` and build the service.
    ///
    /// An injected store is used as is. Otherwise the SQLite store at
    /// `config.database_path` is opened, which requires `desktop-shims`.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        if let Some(store) = config.key_value_store.clone() {
            info!("Using injected key-value store");
            return Ok(Self::new(&config, store));
        }

        let store = open_database(&config).await?;
        Ok(Self::new(&config, store))
    }

    /// The genre library shared by every screen.
    pub fn library(&self) -> Arc<dyn GenreSongStore> {
        self.library.clone()
    }

    /// Subscribe to library change notifications.
    pub fn subscribe(&self) -> Receiver<LibraryEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }
}

#[cfg(feature = "desktop-shims")]
async fn open_database(config: &CoreConfig) -> Result<Arc<dyn KeyValueStore>> {
    use core_runtime::logging::strip_path;

    let path = config
        .database_path
        .clone()
        .ok_or_else(|| CoreError::CapabilityMissing {
            capability: "KeyValueStore".to_string(),
            message: "No key-value store injected and no database path available".to_string(),
        })?;

    let store = bridge_desktop::SqliteKeyValueStore::new(path.clone())
        .await
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;

    info!(db = %strip_path(&path.to_string_lossy()), "Opened genre library database");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
async fn open_database(_config: &CoreConfig) -> Result<Arc<dyn KeyValueStore>> {
    Err(CoreError::CapabilityMissing {
        capability: "KeyValueStore".to_string(),
        message: "Opening a database path requires the 'desktop-shims' feature; \
                  inject a KeyValueStore instead"
            .to_string(),
    })
}

/// Convenience bootstrapper for desktop hosts.
///
/// Opens the library at the platform data directory with default settings.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// use core_library::SongCandidate;
///
/// let core = core_service::bootstrap_desktop().await?;
/// core.library()
///     .save("Rock", SongCandidate::from_query("Song A by Artist X"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop() -> Result<CoreService> {
    let config = CoreConfig::builder().build()?;
    CoreService::bootstrap(config).await
}
