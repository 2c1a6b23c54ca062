//! Transform raw history records into play events and load them
//!
//! All records are mapped first; storage is touched only when every record
//! parsed, and then exactly once, in a single transaction.

use crate::db::Storage;
use crate::error::{SyncError, SyncResult};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rpsync_common::db::PlayEvent;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

/// Timestamp layout of `played_at` in history responses (always UTC)
const PLAYED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

#[derive(Debug, Deserialize)]
struct RawPlay {
    track: RawTrack,
    played_at: String,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    name: String,
    album: RawAlbum,
}

#[derive(Debug, Deserialize)]
struct RawAlbum {
    name: String,
    artists: Vec<RawArtist>,
}

#[derive(Debug, Deserialize)]
struct RawArtist {
    name: String,
}

/// Parse a `played_at` value such as `2024-03-01T12:00:00.000Z`
///
/// Fractional seconds and the `Z` suffix are required.
pub fn parse_played_at(value: &str) -> SyncResult<DateTime<Utc>> {
    let has_fraction = value
        .split_once('T')
        .map(|(_, time)| time.contains('.'))
        .unwrap_or(false);

    if !has_fraction || !value.ends_with('Z') {
        return Err(SyncError::Parse(format!(
            "played_at '{}' is not YYYY-MM-DDTHH:MM:SS.fffZ",
            value
        )));
    }

    let naive = NaiveDateTime::parse_from_str(value, PLAYED_AT_FORMAT)
        .map_err(|e| SyncError::Parse(format!("played_at '{}': {}", value, e)))?;

    Ok(Utc.from_utc_datetime(&naive))
}

fn transform_one(index: usize, record: &Value) -> SyncResult<PlayEvent> {
    let raw: RawPlay = serde_json::from_value(record.clone())
        .map_err(|e| SyncError::Parse(format!("record {}: {}", index, e)))?;

    let artist = raw
        .track
        .album
        .artists
        .into_iter()
        .next()
        .ok_or_else(|| SyncError::Parse(format!("record {}: album has no artists", index)))?;

    let played_at = parse_played_at(&raw.played_at)?;

    Ok(PlayEvent::new(
        raw.track.name,
        artist.name,
        raw.track.album.name,
        played_at,
    ))
}

/// Map raw records to play events, failing on the first bad record
pub fn transform(records: &[Value]) -> SyncResult<Vec<PlayEvent>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| transform_one(index, record))
        .collect()
}

/// Transform and insert as one batch; returns the committed row count
pub async fn load(storage: &Storage, records: &[Value]) -> SyncResult<u64> {
    let rows = transform(records)?;
    debug!(rows = rows.len(), "Transformed history records");

    let inserted = storage.insert_batch(&rows).await?;

    info!(inserted, "Loaded play events");
    Ok(inserted)
}
