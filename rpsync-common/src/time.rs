//! Timestamp utilities
//!
//! Play timestamps are kept as `DateTime<Utc>` in memory and as fixed-width
//! UTC text in SQLite so that `MAX(played_at)` orders chronologically.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::{Error, Result};

/// Text layout of `played_at` in the database (millisecond precision)
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds since the Unix epoch, the cursor unit of the history endpoint
pub fn to_epoch_millis(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

/// Render a timestamp in the storage layout
pub fn format_for_storage(timestamp: DateTime<Utc>) -> String {
    timestamp.format(STORAGE_FORMAT).to_string()
}

/// Parse a timestamp previously written with [`format_for_storage`]
///
/// Rows written by other tools without fractional seconds are accepted too.
pub fn parse_from_storage(value: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| Error::InvalidInput(format!("stored timestamp '{}': {}", value, e)))?;

    Ok(Utc.from_utc_datetime(&naive))
}
