//! Shared fixtures for rpsync integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rpsync::db::Storage;
use rpsync_common::db::{play_events_table, PlayEvent};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

/// Storage on a fresh database file; keep the TempDir alive for the test
pub async fn temp_storage(deduplicate: bool) -> (TempDir, Storage) {
    let dir = TempDir::new().unwrap();
    let storage = Storage::open(&dir.path().join("history.db"), play_events_table(deduplicate))
        .await
        .unwrap();
    storage.ensure_schema().await.unwrap();
    (dir, storage)
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub fn play(name: &str, played_at: DateTime<Utc>) -> PlayEvent {
    PlayEvent::new(name, format!("{} Artist", name), format!("{} Album", name), played_at)
}

/// One history item as the Web API returns it
pub fn history_item(name: &str, played_at: &str) -> Value {
    json!({
        "track": {
            "name": name,
            "album": {
                "name": format!("{} Album", name),
                "artists": [{ "name": format!("{} Artist", name) }]
            }
        },
        "played_at": played_at,
        "context": null
    })
}

/// Make SQLite abort any insert of a row whose song is named "Poison"
pub async fn install_reject_trigger(dir: &Path) {
    let pool = rpsync_common::db::open_database(&dir.join("history.db"))
        .await
        .unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_poison BEFORE INSERT ON recently_played_songs \
         WHEN NEW.song_name = 'Poison' BEGIN SELECT RAISE(ABORT, 'poison row'); END",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;
}
