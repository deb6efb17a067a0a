//! Domain models for the genre library
//!
//! `SongCandidate` is what the discovery screens hand over (a catalog hit or a
//! manually typed entry); `Song` is what ends up persisted in a genre bucket.

use crate::error::{LibraryError, Result};
use core_runtime::config::MissingArtistPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Placeholder stored when a song arrives without an artist.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Separator used by free-text entries such as "Song A by Artist X".
const TITLE_ARTIST_SEPARATOR: &str = " by ";

/// Normalize a genre display name into its bucket identity.
///
/// Trims surrounding whitespace and lowercases. `None` stays `None`; a blank
/// name normalizes to an empty string, which the store rejects.
pub fn normalize_genre(name: Option<&str>) -> Option<String> {
    name.map(|name| name.trim().to_lowercase())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Split "Title by Artist" at the first separator. Both parts must be
/// non-blank; any later " by " stays in the artist.
fn split_title_artist(text: &str) -> Option<(String, String)> {
    let (title, artist) = text.split_once(TITLE_ARTIST_SEPARATOR)?;
    let title = title.trim();
    let artist = artist.trim();

    if title.is_empty() || artist.is_empty() {
        return None;
    }

    Some((title.to_string(), artist.to_string()))
}

// =============================================================================
// Song
// =============================================================================

/// A song persisted inside a genre bucket.
///
/// Field names follow the stored JSON layout (`albumCover`, `deezerLink`, ...).
/// Optional links are written as `null` when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default = "unknown_artist")]
    pub artist: String,
    /// Genre exactly as the user typed it when saving.
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub album_cover: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub deezer_link: Option<String>,
    #[serde(default)]
    pub spotify_link: Option<String>,
}

fn unknown_artist() -> String {
    UNKNOWN_ARTIST.to_string()
}

impl Song {
    /// Identity used for duplicate detection within a bucket.
    pub fn key(&self) -> SongKey {
        SongKey::new(&self.title, &self.artist)
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" by {}", self.title, self.artist)
    }
}

/// Case- and whitespace-insensitive `(title, artist)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SongKey {
    title: String,
    artist: String,
}

impl SongKey {
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            title: title.trim().to_lowercase(),
            artist: artist.trim().to_lowercase(),
        }
    }
}

// =============================================================================
// Candidate
// =============================================================================

/// A song as offered by a catalog search or manual entry, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongCandidate {
    pub id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_cover: Option<String>,
    pub preview: Option<String>,
    pub deezer_link: Option<String>,
    pub spotify_link: Option<String>,
}

impl SongCandidate {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            artist: Some(artist.into()),
            ..Self::default()
        }
    }

    /// Parse a free-text entry such as `"Song A by Artist X"`.
    ///
    /// Text without the separator becomes the title and leaves the artist
    /// unset.
    pub fn from_query(query: &str) -> Self {
        match split_title_artist(query) {
            Some((title, artist)) => Self::new(title, artist),
            None => Self {
                title: non_blank(Some(query)).map(str::to_string),
                ..Self::default()
            },
        }
    }

    /// Build a candidate from a catalog search result.
    ///
    /// Understands the flat stored layout as well as Deezer
    /// (`artist.name`, `album.cover_medium`, `link`) and Spotify
    /// (`name`, `artists[0].name`, `preview_url`, `external_urls.spotify`)
    /// track objects. Unknown fields are ignored.
    pub fn from_json(value: &Value) -> Self {
        let id = value.get("id").and_then(|id| match id {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        });

        let title = string_at(value, &["title"]).or_else(|| string_at(value, &["name"]));

        let artist = match value.get("artist") {
            Some(Value::String(name)) => Some(name.clone()),
            Some(artist @ Value::Object(_)) => string_at(artist, &["name"]),
            _ => value
                .get("artists")
                .and_then(|artists| artists.get(0))
                .and_then(|first| string_at(first, &["name"])),
        };

        let album_cover = string_at(value, &["albumCover"])
            .or_else(|| string_at(value, &["album", "cover_medium"]))
            .or_else(|| string_at(value, &["album", "cover_big"]))
            .or_else(|| string_at(value, &["album", "cover"]))
            .or_else(|| {
                value
                    .pointer("/album/images/0/url")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });

        let preview = string_at(value, &["preview"])
            .or_else(|| string_at(value, &["previewUrl"]))
            .or_else(|| string_at(value, &["preview_url"]));

        let deezer_link =
            string_at(value, &["deezerLink"]).or_else(|| string_at(value, &["link"]));

        let spotify_link = string_at(value, &["spotifyLink"])
            .or_else(|| string_at(value, &["external_urls", "spotify"]));

        Self {
            id,
            title,
            artist,
            album_cover,
            preview,
            deezer_link,
            spotify_link,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_album_cover(mut self, url: impl Into<String>) -> Self {
        self.album_cover = Some(url.into());
        self
    }

    pub fn with_preview(mut self, url: impl Into<String>) -> Self {
        self.preview = Some(url.into());
        self
    }

    pub fn with_deezer_link(mut self, url: impl Into<String>) -> Self {
        self.deezer_link = Some(url.into());
        self
    }

    pub fn with_spotify_link(mut self, url: impl Into<String>) -> Self {
        self.spotify_link = Some(url.into());
        self
    }

    /// Trimmed `(title, artist)` this candidate would be stored under.
    ///
    /// A title of the form "Song by Artist" supplies the artist when none was
    /// given (or the placeholder was given).
    ///
    /// # Errors
    ///
    /// `Validation` when the title is missing or blank, or when the artist is
    /// missing and `policy` is [`MissingArtistPolicy::Reject`].
    pub fn resolve_identity(&self, policy: MissingArtistPolicy) -> Result<(String, String)> {
        let title = non_blank(self.title.as_deref())
            .ok_or_else(|| LibraryError::validation("title", "Song title is required"))?;

        let artist = non_blank(self.artist.as_deref());
        if let Some(artist) = artist.filter(|artist| *artist != UNKNOWN_ARTIST) {
            return Ok((title.to_string(), artist.to_string()));
        }

        if let Some(parts) = split_title_artist(title) {
            return Ok(parts);
        }

        match (artist, policy) {
            (Some(placeholder), _) => Ok((title.to_string(), placeholder.to_string())),
            (None, MissingArtistPolicy::Substitute) => {
                Ok((title.to_string(), UNKNOWN_ARTIST.to_string()))
            }
            (None, MissingArtistPolicy::Reject) => Err(LibraryError::validation(
                "artist",
                "Song artist is required",
            )),
        }
    }
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for segment in path {
        current = current.get(*segment)?;
    }
    current.as_str().map(str::to_string)
}

// =============================================================================
// References and outcomes
// =============================================================================

/// Identifies a song to delete from a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongRef {
    Id(String),
    /// Matched on the normalized `(title, artist)` pair.
    Named { title: String, artist: String },
}

impl SongRef {
    pub fn id(id: impl Into<String>) -> Self {
        SongRef::Id(id.into())
    }

    /// A blank artist refers to songs stored under [`UNKNOWN_ARTIST`].
    pub fn named(title: impl Into<String>, artist: impl Into<String>) -> Self {
        let artist = artist.into();
        let artist = if artist.trim().is_empty() {
            UNKNOWN_ARTIST.to_string()
        } else {
            artist
        };

        SongRef::Named {
            title: title.into(),
            artist,
        }
    }

    pub fn matches(&self, song: &Song) -> bool {
        match self {
            // Legacy records carry no id; a blank id never identifies a song
            SongRef::Id(id) => !id.trim().is_empty() && song.id == *id,
            SongRef::Named { title, artist } => song.key() == SongKey::new(title, artist),
        }
    }
}

impl From<&Song> for SongRef {
    fn from(song: &Song) -> Self {
        if song.id.is_empty() {
            SongRef::named(song.title.clone(), song.artist.clone())
        } else {
            SongRef::Id(song.id.clone())
        }
    }
}

/// Result of [`GenreSongStore::save`](crate::store::GenreSongStore::save).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The song was appended; carries the stored record.
    Saved(Song),
    /// The bucket already holds this song; carries the existing record.
    Duplicate(Song),
}

impl SaveOutcome {
    pub fn song(&self) -> &Song {
        match self {
            SaveOutcome::Saved(song) | SaveOutcome::Duplicate(song) => song,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, SaveOutcome::Duplicate(_))
    }

    /// Message suitable for showing to the end user.
    pub fn notice(&self, genre: &str) -> String {
        let genre = genre.trim();
        match self {
            SaveOutcome::Saved(song) => format!("{} saved to {}.", song, genre),
            SaveOutcome::Duplicate(song) => format!("{} is already in {}.", song, genre),
        }
    }
}

/// Every song stored under one normalized genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreBucket {
    pub genre: String,
    pub songs: Vec<Song>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_genre() {
        assert_eq!(normalize_genre(Some(" Rock ")), Some("rock".to_string()));
        assert_eq!(normalize_genre(Some("HIP hop")), Some("hip hop".to_string()));
        assert_eq!(normalize_genre(Some("   ")), Some(String::new()));
        assert_eq!(normalize_genre(None), None);
    }

    #[test]
    fn test_normalize_genre_idempotent() {
        for name in ["Rock", "  Jazz\t", "ÉLECTRO", "", "lo-fi Beats "] {
            let once = normalize_genre(Some(name));
            let twice = normalize_genre(once.as_deref());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_song_key_ignores_case_and_padding() {
        assert_eq!(
            SongKey::new(" Song A ", "artist x"),
            SongKey::new("song a", "Artist X")
        );
        assert_ne!(SongKey::new("Song A", "Artist X"), SongKey::new("Song A", "Artist Y"));
    }

    #[test]
    fn test_from_query_splits_title_and_artist() {
        let candidate = SongCandidate::from_query("Song A by Artist X");
        assert_eq!(candidate.title.as_deref(), Some("Song A"));
        assert_eq!(candidate.artist.as_deref(), Some("Artist X"));

        let plain = SongCandidate::from_query("  Song A  ");
        assert_eq!(plain.title.as_deref(), Some("Song A"));
        assert_eq!(plain.artist, None);

        assert_eq!(SongCandidate::from_query("   ").title, None);
    }

    #[test]
    fn test_split_keeps_remainder_in_artist() {
        let candidate = SongCandidate::from_query("Song A by Artist X by Night");
        assert_eq!(candidate.title.as_deref(), Some("Song A"));
        assert_eq!(candidate.artist.as_deref(), Some("Artist X by Night"));
    }

    #[test]
    fn test_from_json_deezer_shape() {
        let hit = json!({
            "id": 3135556,
            "title": "Harder, Better, Faster, Stronger",
            "link": "https://www.deezer.com/track/3135556",
            "preview": "https://cdns-preview.dzcdn.net/stream/abc.mp3",
            "artist": { "id": 27, "name": "Daft Punk" },
            "album": {
                "cover": "https://api.deezer.com/album/302127/image",
                "cover_medium": "https://e-cdns-images.dzcdn.net/images/cover/medium.jpg"
            }
        });

        let candidate = SongCandidate::from_json(&hit);
        assert_eq!(candidate.id.as_deref(), Some("3135556"));
        assert_eq!(candidate.title.as_deref(), Some("Harder, Better, Faster, Stronger"));
        assert_eq!(candidate.artist.as_deref(), Some("Daft Punk"));
        assert_eq!(
            candidate.album_cover.as_deref(),
            Some("https://e-cdns-images.dzcdn.net/images/cover/medium.jpg")
        );
        assert_eq!(
            candidate.deezer_link.as_deref(),
            Some("https://www.deezer.com/track/3135556")
        );
        assert_eq!(candidate.spotify_link, None);
    }

    #[test]
    fn test_from_json_spotify_shape() {
        let hit = json!({
            "id": "0DiWol3AO6WpXZgp0goxAV",
            "name": "One More Time",
            "artists": [{ "name": "Daft Punk" }],
            "preview_url": "https://p.scdn.co/mp3-preview/xyz",
            "album": { "images": [{ "url": "https://i.scdn.co/image/cover" }] },
            "external_urls": { "spotify": "https://open.spotify.com/track/0DiWol3AO6WpXZgp0goxAV" }
        });

        let candidate = SongCandidate::from_json(&hit);
        assert_eq!(candidate.title.as_deref(), Some("One More Time"));
        assert_eq!(candidate.artist.as_deref(), Some("Daft Punk"));
        assert_eq!(candidate.album_cover.as_deref(), Some("https://i.scdn.co/image/cover"));
        assert_eq!(
            candidate.preview.as_deref(),
            Some("https://p.scdn.co/mp3-preview/xyz")
        );
        assert!(candidate.spotify_link.is_some());
    }

    #[test]
    fn test_from_json_flat_shape() {
        let stored = json!({
            "title": "Song A",
            "artist": "Artist X",
            "albumCover": null,
            "previewUrl": "https://example.com/a.mp3"
        });

        let candidate = SongCandidate::from_json(&stored);
        assert_eq!(candidate.artist.as_deref(), Some("Artist X"));
        assert_eq!(candidate.album_cover, None);
        assert_eq!(candidate.preview.as_deref(), Some("https://example.com/a.mp3"));
    }

    #[test]
    fn test_resolve_identity() {
        let policy = MissingArtistPolicy::Substitute;

        let trimmed = SongCandidate::new(" Song A ", " Artist X ");
        assert_eq!(
            trimmed.resolve_identity(policy).unwrap(),
            ("Song A".to_string(), "Artist X".to_string())
        );

        let missing = SongCandidate {
            title: Some("Song A".into()),
            ..SongCandidate::default()
        };
        assert_eq!(missing.resolve_identity(policy).unwrap().1, UNKNOWN_ARTIST);
        assert!(matches!(
            missing.resolve_identity(MissingArtistPolicy::Reject),
            Err(LibraryError::Validation { ref field, .. }) if field == "artist"
        ));

        let embedded = SongCandidate::new("Song A by Artist X", UNKNOWN_ARTIST);
        assert_eq!(
            embedded.resolve_identity(policy).unwrap(),
            ("Song A".to_string(), "Artist X".to_string())
        );

        let explicit = SongCandidate::new("Stand by Me", "Ben E. King");
        assert_eq!(explicit.resolve_identity(policy).unwrap().0, "Stand by Me");

        let untitled = SongCandidate::new("  ", "Artist X");
        assert!(matches!(
            untitled.resolve_identity(policy),
            Err(LibraryError::Validation { ref field, .. }) if field == "title"
        ));
    }

    #[test]
    fn test_song_json_layout() {
        let song = Song {
            id: "song-a".into(),
            title: "Song A".into(),
            artist: "Artist X".into(),
            genre: "Rock".into(),
            album_cover: None,
            preview: Some("https://example.com/a.mp3".into()),
            deezer_link: None,
            spotify_link: None,
        };

        let json = serde_json::to_value(&song).unwrap();
        assert_eq!(json["albumCover"], Value::Null);
        assert_eq!(json["deezerLink"], Value::Null);
        assert_eq!(json["preview"], "https://example.com/a.mp3");
    }

    #[test]
    fn test_song_reads_legacy_records() {
        let legacy: Song = serde_json::from_value(json!({ "title": "Song A" })).unwrap();
        assert_eq!(legacy.id, "");
        assert_eq!(legacy.artist, UNKNOWN_ARTIST);
        assert_eq!(SongRef::from(&legacy), SongRef::named("Song A", UNKNOWN_ARTIST));
    }

    #[test]
    fn test_song_ref_matching() {
        let song = Song {
            id: "1".into(),
            title: "Song A".into(),
            artist: "Artist X".into(),
            genre: "rock".into(),
            album_cover: None,
            preview: None,
            deezer_link: None,
            spotify_link: None,
        };

        assert!(SongRef::id("1").matches(&song));
        assert!(!SongRef::id("2").matches(&song));
        assert!(SongRef::named(" song a", "ARTIST X ").matches(&song));
        assert!(!SongRef::named("Song A", "").matches(&song));
    }

    #[test]
    fn test_blank_id_matches_nothing() {
        let legacy: Song = serde_json::from_value(json!({
            "title": "Song A",
            "artist": "Artist X"
        }))
        .unwrap();

        assert!(!SongRef::id("").matches(&legacy));
        assert!(!SongRef::id("  ").matches(&legacy));
        assert!(SongRef::named("Song A", "Artist X").matches(&legacy));
    }

    #[test]
    fn test_save_outcome_notice() {
        let song = Song {
            id: "1".into(),
            title: "Song A".into(),
            artist: "Artist X".into(),
            genre: "Rock".into(),
            album_cover: None,
            preview: None,
            deezer_link: None,
            spotify_link: None,
        };

        let saved = SaveOutcome::Saved(song.clone());
        let duplicate = SaveOutcome::Duplicate(song);
        assert!(saved.is_saved());
        assert!(duplicate.is_duplicate());
        assert_ne!(saved.notice("Rock"), duplicate.notice("Rock"));
        assert_eq!(duplicate.notice(" Rock "), "\"Song A\" by Artist X is already in Rock.");
    }
}
