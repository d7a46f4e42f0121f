//! NutriTrack Library
//!
//! Turns free-form meal analysis responses into validated nutrition records
//! and tracks them against daily goals.

pub mod build_info;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod service;
pub mod tools;
pub mod upstream;

pub use error::{Error, Result};
