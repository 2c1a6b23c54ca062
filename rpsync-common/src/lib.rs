//! # rpsync common library
//!
//! Shared code for the recently-played sync job:
//! - Error type and result alias
//! - Configuration loading and root folder resolution
//! - Declarative table definitions and schema creation
//! - The `PlayEvent` model
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
