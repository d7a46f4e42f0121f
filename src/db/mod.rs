//! Database module
//!
//! SQLite persistence for meals and goals.

pub mod connection;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
