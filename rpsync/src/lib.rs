//! rpsync library interface
//!
//! Incremental sync of Spotify's recently-played history into SQLite. The
//! binary runs [`sync_once`]; the stages are public for integration testing.

pub mod db;
pub mod error;
pub mod pipeline;
pub mod secrets;
pub mod services;

pub use crate::error::{StorageWriteError, SyncError, SyncResult};
pub use crate::pipeline::{sync_once, Pipeline, PipelineState, SyncReport};
