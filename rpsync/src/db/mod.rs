//! Database access for the sync job

pub mod play_events;

pub use play_events::Storage;
