//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One play of one track, as stored in `recently_played_songs`
///
/// `id` is `None` until the row has been written; storage assigns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub id: Option<i64>,
    pub song_name: String,
    /// First artist credited on the track's album
    pub artist: String,
    pub album: String,
    /// When playback started, as reported by Spotify
    pub played_at: DateTime<Utc>,
}

impl PlayEvent {
    /// Create an unsaved play event
    pub fn new(
        song_name: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        played_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            song_name: song_name.into(),
            artist: artist.into(),
            album: album.into(),
            played_at,
        }
    }
}
