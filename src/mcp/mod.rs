//! MCP Server module
//!
//! Exposes the meal analysis tools over the Model Context Protocol.

pub mod server;

pub use server::NutritrackService;
