//! Database models, table definitions and initialization

pub mod init;
pub mod models;
pub mod schema;
pub mod tables;

pub use init::*;
pub use models::*;
pub use schema::*;
pub use tables::*;
