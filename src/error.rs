//! Error types
//!
//! Parse warnings are collected, never raised. Validation errors reject a
//! single record. Upstream errors come from the vision model or a store.

use serde::Serialize;
use thiserror::Error;

/// A record field failed validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must not be negative (got {value})")]
    Negative { field: String, value: f64 },

    #[error("{field} is not a finite number")]
    NotFinite { field: String },
}

impl ValidationError {
    /// Name of the offending field, e.g. `totals.fat_g` or `items[2].calories`
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Negative { field, .. } => field,
            ValidationError::NotFinite { field } => field,
        }
    }
}

/// Failure in a collaborator outside the core (vision model, store)
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Vision model request failed: {0}")]
    Transport(String),

    #[error("Store error: {0}")]
    Store(String),
}

/// Rejected goal update
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GoalError {
    #[error("{field} goal {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("Unknown goal preset: {0}")]
    UnknownPreset(String),
}

/// Invalid configuration value
#[derive(Debug, Error)]
#[error("Invalid value for {var}: {value:?}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Goal(#[from] GoalError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Unknown meal type: {0}")]
    UnknownMealType(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal problem met while scanning a model response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// A table row looked like data but its nutrient cells were not numeric
    MalformedTableRow { line: usize },
    /// The response looked like JSON but could not be decoded
    MalformedJson { message: String },
    /// A structured food item had a field that was not a number
    MalformedItemField { index: usize, field: String },
}
