//! NutriTrack Tools module
//!
//! Tool implementations behind the MCP server. Each returns a serializable
//! response or a user-facing error message.

pub mod goals;
pub mod meals;
pub mod status;

use chrono::{Local, NaiveDate};

/// Parse a `YYYY-MM-DD` date, defaulting to today when absent
pub(crate) fn parse_date(date: Option<&str>) -> Result<NaiveDate, String> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|e| format!("Invalid date '{}': {} (expected YYYY-MM-DD)", d, e)),
        None => Ok(Local::now().date_naive()),
    }
}
