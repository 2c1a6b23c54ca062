//! Error types for the sync job
//!
//! Every stage returns [`SyncError`]. Nothing inside the pipeline retries or
//! recovers; the first error ends the run.

use thiserror::Error;

/// A batch insert that was rolled back
///
/// No row of the batch is left behind when this is returned.
#[derive(Debug, Error)]
#[error("Error inserting {rows} rows into the database (rolled back): {source}")]
pub struct StorageWriteError {
    /// Size of the rejected batch
    pub rows: usize,
    #[source]
    pub source: sqlx::Error,
}

impl StorageWriteError {
    pub fn new(rows: usize, source: sqlx::Error) -> Self {
        Self { rows, source }
    }
}

/// Sync pipeline errors
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required Spotify secret is missing or blank
    #[error("Secret error: {0}")]
    Secret(String),

    /// Token endpoint answered with something other than 200
    #[error("Failed to refresh access token: HTTP {status}: {body}")]
    AuthRefresh { status: u16, body: String },

    /// History endpoint answered with something other than 200
    #[error("Failed to fetch recently played tracks: HTTP {status}: {body}")]
    Fetch { status: u16, body: String },

    /// Transport-level HTTP failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Malformed response body, record or timestamp
    #[error("Parse error: {0}")]
    Parse(String),

    /// Batch insert failed and was rolled back
    #[error("Load error: {0}")]
    Load(#[from] StorageWriteError),

    /// Storage open, schema or read failure
    #[error("Storage error: {0}")]
    Storage(#[from] rpsync_common::Error),
}

impl From<sqlx::Error> for SyncError {
    fn from(e: sqlx::Error) -> Self {
        SyncError::Storage(rpsync_common::Error::Database(e))
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
