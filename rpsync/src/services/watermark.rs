//! Watermark resolution
//!
//! The watermark is the newest stored `played_at`, in epoch milliseconds.
//! An empty table falls back to the configured [`InitialWatermark`].

use crate::db::Storage;
use chrono::{DateTime, Duration, Utc};
use rpsync_common::config::InitialWatermark;
use rpsync_common::time::{now, to_epoch_millis};
use rpsync_common::Result;
use tracing::info;

/// Cursor for an empty table, relative to `now`
pub fn initial_watermark_millis(policy: InitialWatermark, now: DateTime<Utc>) -> i64 {
    match policy {
        InitialWatermark::Epoch => 0,
        InitialWatermark::LookbackHours(hours) => {
            to_epoch_millis(now - Duration::hours(i64::from(hours))).max(0)
        }
    }
}

/// Latest ingested play as epoch milliseconds, or the initial policy value
pub async fn latest_watermark(storage: &Storage, policy: InitialWatermark) -> Result<i64> {
    match storage.max_played_at().await? {
        Some(latest) => {
            let millis = to_epoch_millis(latest);
            info!(watermark = millis, latest = %latest, "Resolved watermark from stored plays");
            Ok(millis)
        }
        None => {
            let millis = initial_watermark_millis(policy, now());
            info!(watermark = millis, ?policy, "No stored plays; using initial watermark");
            Ok(millis)
        }
    }
}
