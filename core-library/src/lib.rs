//! # Genre Library Module
//!
//! Owns the songs a user has accepted and the genres they are filed under.
//!
//! ## Overview
//!
//! This module manages:
//! - Song records and the loosely-shaped candidates they are built from
//! - Genre name normalization and duplicate detection
//! - The `GenreSongStore` service that persists one JSON bucket per genre
//!   in a host `KeyValueStore`
//!
//! A genre exists exactly as long as its bucket holds at least one song, so
//! the genre list is always derived from the stored keys rather than kept as
//! a separate index.

pub mod error;
pub mod models;
pub mod store;

pub use error::{ErrorCategory, LibraryError, Result};
pub use models::{
    normalize_genre, GenreBucket, SaveOutcome, Song, SongCandidate, SongRef, UNKNOWN_ARTIST,
};
pub use store::{GenreSongStore, KvGenreSongStore};
