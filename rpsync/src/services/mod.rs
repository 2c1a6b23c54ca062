//! Sync stages
//!
//! Leaves first: token refresh and history fetch talk to Spotify, the
//! watermark and loader talk to storage.

pub mod history_client;
pub mod loader;
pub mod token_refresher;
pub mod watermark;

pub use history_client::{HistoryClient, PAGE_LIMIT};
pub use loader::{load, parse_played_at, transform};
pub use token_refresher::{basic_credential, AccessToken, TokenRefresher};
pub use watermark::{initial_watermark_millis, latest_watermark};
