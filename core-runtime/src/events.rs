//! # Event Bus System
//!
//! Broadcasts library change notifications using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! Every screen of the host shows a view derived from the same genre store
//! (genre list, genre detail, search results). Rather than polling, screens
//! subscribe to the [`EventBus`] and refresh when a [`LibraryEvent`] arrives.
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐   subscribe   ┌──────────────┐
//! │ Genre store  ├────────────>│ EventBus  ├──────────────>│ Genre list   │
//! └──────────────┘             │ (broadcast├──────────────>│ Genre detail │
//!                              │  channel) │               └──────────────┘
//!                              └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, LibraryEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(LibraryEvent::GenreRemoved {
//!         genre: "jazz".to_string(),
//!     })
//!     .ok();
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```
//!
//! ## Lagging
//!
//! Subscribers that fall more than `capacity` events behind receive
//! `RecvError::Lagged(n)` and should reload their view from the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Event Types
// ============================================================================

/// Changes to the persisted genre library.
///
/// Genre names carried by events are always normalized (trimmed, lowercase).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A song was appended to a genre bucket.
    SongSaved {
        genre: String,
        song_id: String,
        title: String,
        artist: String,
    },
    /// A save was refused because the bucket already holds the song.
    DuplicateRejected {
        genre: String,
        title: String,
        artist: String,
    },
    /// A song was removed from a genre bucket.
    SongDeleted { genre: String, song_id: String },
    /// The last song of a genre was removed and the genre no longer exists.
    GenreRemoved { genre: String },
    /// Every genre bucket was removed.
    LibraryCleared { genres_removed: usize },
}

impl LibraryEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            LibraryEvent::SongSaved { .. } => "Song added to genre",
            LibraryEvent::DuplicateRejected { .. } => "Song already exists in genre",
            LibraryEvent::SongDeleted { .. } => "Song removed from genre",
            LibraryEvent::GenreRemoved { .. } => "Genre removed because it became empty",
            LibraryEvent::LibraryCleared { .. } => "All genres cleared",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            LibraryEvent::DuplicateRejected { .. } => EventSeverity::Warning,
            LibraryEvent::GenreRemoved { .. } | LibraryEvent::LibraryCleared { .. } => {
                EventSeverity::Info
            }
            _ => EventSeverity::Debug,
        }
    }

    /// Normalized genre the event concerns, if it concerns exactly one.
    pub fn genre(&self) -> Option<&str> {
        match self {
            LibraryEvent::SongSaved { genre, .. }
            | LibraryEvent::DuplicateRejected { genre, .. }
            | LibraryEvent::SongDeleted { genre, .. }
            | LibraryEvent::GenreRemoved { genre } => Some(genre),
            LibraryEvent::LibraryCleared { .. } => None,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for library events.
///
/// Cloning the bus is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LibraryEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are no active subscribers.
    pub fn emit(&self, event: LibraryEvent) -> Result<usize, SendError<LibraryEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<LibraryEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&LibraryEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// // A genre detail screen only cares about its own genre.
/// let rock_stream = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.genre() == Some("rock"));
/// ```
pub struct EventStream {
    receiver: Receiver<LibraryEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<LibraryEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events that match `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&LibraryEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &LibraryEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<LibraryEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<LibraryEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
