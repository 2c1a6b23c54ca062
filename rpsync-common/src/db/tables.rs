//! Table definitions
//!
//! Single source of truth for the tables this project owns.

use crate::db::schema::{ColumnDefinition, IndexDefinition, TableDefinition};

/// Table holding ingested play events
pub const PLAY_EVENTS_TABLE: &str = "recently_played_songs";

/// Definition of `recently_played_songs`
///
/// With `deduplicate` set, a unique index on (played_at, song_name, artist)
/// is added so the same play fetched twice is stored once.
pub fn play_events_table(deduplicate: bool) -> TableDefinition {
    let table = TableDefinition::new(PLAY_EVENTS_TABLE)
        .column(
            ColumnDefinition::new("id", "INTEGER")
                .primary_key()
                .autoincrement(),
        )
        .column(ColumnDefinition::new("song_name", "TEXT").not_null())
        .column(ColumnDefinition::new("artist", "TEXT").not_null())
        .column(ColumnDefinition::new("album", "TEXT").not_null())
        .column(ColumnDefinition::new("played_at", "TIMESTAMP").not_null())
        .index(IndexDefinition::new(
            "idx_recently_played_songs_played_at",
            &["played_at"],
        ));

    if deduplicate {
        table.index(
            IndexDefinition::new(
                "idx_recently_played_songs_dedup",
                &["played_at", "song_name", "artist"],
            )
            .unique(),
        )
    } else {
        table
    }
}
