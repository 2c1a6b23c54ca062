//! Play event storage
//!
//! [`Storage`] owns the connection pool and the table definition it was
//! built with. Each operation acquires its own connection or transaction and
//! releases it before returning, whichever way it returns.

use crate::error::StorageWriteError;
use chrono::{DateTime, Utc};
use rpsync_common::db::{ensure_table, open_database, PlayEvent, SchemaIntrospector, TableDefinition};
use rpsync_common::time::{format_for_storage, parse_from_storage};
use rpsync_common::Result;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info, warn};

/// Storage accessor for `recently_played_songs`
pub struct Storage {
    pool: SqlitePool,
    table: TableDefinition,
}

impl Storage {
    /// Wrap an open pool
    pub fn new(pool: SqlitePool, table: TableDefinition) -> Self {
        Self { pool, table }
    }

    /// Open (creating if missing) the database file
    pub async fn open(db_path: &Path, table: TableDefinition) -> Result<Self> {
        let pool = open_database(db_path).await?;
        Ok(Self::new(pool, table))
    }

    /// Create the table and indexes if absent; no-op when already present
    pub async fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        ensure_table(&mut conn, &self.table).await
    }

    /// Latest `played_at` across all rows, `None` for an empty table
    pub async fn max_played_at(&self) -> Result<Option<DateTime<Utc>>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!("SELECT MAX(played_at) FROM {}", self.table.name);
        let latest: Option<String> = sqlx::query_scalar(&sql)
            .fetch_one(&mut *conn)
            .await?;

        latest.as_deref().map(parse_from_storage).transpose()
    }

    /// Insert all rows in one transaction
    ///
    /// Returns the number of rows written. When the stored table carries a
    /// unique index, duplicates are skipped (`INSERT OR IGNORE`) and not
    /// counted. Any failure rolls the whole batch back.
    pub async fn insert_batch(&self, rows: &[PlayEvent]) -> std::result::Result<u64, StorageWriteError> {
        if rows.is_empty() {
            debug!("No rows to insert");
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageWriteError::new(rows.len(), e))?;

        // The live table decides; a unique index may outlive the config that created it
        let unique = SchemaIntrospector::has_unique_index(&mut tx, &self.table.name)
            .await
            .map_err(|e| StorageWriteError::new(rows.len(), e))?;
        let verb = if unique { "INSERT OR IGNORE" } else { "INSERT" };
        let sql = format!(
            "{} INTO {} (song_name, artist, album, played_at) VALUES (?, ?, ?, ?)",
            verb, self.table.name
        );

        let mut inserted = 0u64;
        for (index, row) in rows.iter().enumerate() {
            let result = sqlx::query(&sql)
                .bind(&row.song_name)
                .bind(&row.artist)
                .bind(&row.album)
                .bind(format_for_storage(row.played_at))
                .execute(&mut *tx)
                .await;

            match result {
                Ok(done) => inserted += done.rows_affected(),
                Err(e) => {
                    warn!(row = index, error = %e, "Insert failed, rolling back batch");
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(error = %rollback_err, "Rollback failed");
                    }
                    return Err(StorageWriteError::new(rows.len(), e));
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| StorageWriteError::new(rows.len(), e))?;

        if inserted < rows.len() as u64 {
            info!(
                inserted,
                skipped = rows.len() as u64 - inserted,
                "Skipped play events already stored"
            );
        }

        Ok(inserted)
    }

    /// Number of stored play events
    pub async fn count(&self) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT COUNT(*) FROM {}", self.table.name);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&mut *conn).await?;
        Ok(count as u64)
    }

    /// Most recent play events, newest first
    pub async fn recent(&self, limit: u32) -> Result<Vec<PlayEvent>> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT id, song_name, artist, album, played_at FROM {} \
             ORDER BY played_at DESC, id DESC LIMIT ?",
            self.table.name
        );
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter()
            .map(|row| -> Result<PlayEvent> {
                let played_at: String = row.get("played_at");
                Ok(PlayEvent {
                    id: Some(row.get("id")),
                    song_name: row.get("song_name"),
                    artist: row.get("artist"),
                    album: row.get("album"),
                    played_at: parse_from_storage(&played_at)?,
                })
            })
            .collect()
    }

    /// Close the pool, waiting for the connection to be returned
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Storage closed");
    }
}
