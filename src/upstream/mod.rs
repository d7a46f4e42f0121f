//! External collaborators
//!
//! The vision model and the stores sit outside the pipeline. They are
//! described here as traits so the application layer can swap them.
//! `SqliteStore` backs the server; `MemoryStore` and `FakeVisionClient`
//! serve tests.

pub mod fake;
pub mod memory;
pub mod prompts;
pub mod sqlite;

pub use fake::FakeVisionClient;
pub use memory::MemoryStore;
pub use prompts::{build_prompt, PromptStyle};
pub use sqlite::SqliteStore;

use std::fmt;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;
use crate::models::{DateRange, GoalSet, NutritionRecord};

/// Identifies the user a request acts for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a stored meal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MealId(pub i64);

/// A meal record as held by a store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMeal {
    pub id: MealId,
    pub user_id: UserId,
    pub logged_at: NaiveDateTime,
    pub record: NutritionRecord,
}

/// Vision model that estimates nutrition from a meal photo.
///
/// The returned text is opaque to the caller and goes straight to the parser.
#[async_trait]
pub trait VisionClient: Send + Sync + fmt::Debug {
    async fn analyze(
        &self,
        image: &[u8],
        mime_type: &str,
        user_note: Option<&str>,
    ) -> Result<String, UpstreamError>;

    /// Model identifier, for logging
    fn model_name(&self) -> &str;
}

/// Persistence for meal records
pub trait MealStore: Send + Sync {
    fn save_meal(&self, user: UserId, record: NutritionRecord) -> Result<MealId, UpstreamError>;

    /// Meals whose record date falls in `range`, ordered by date then log time
    fn meals_between(&self, user: UserId, range: &DateRange) -> Result<Vec<StoredMeal>, UpstreamError>;

    fn meals_on(&self, user: UserId, date: NaiveDate) -> Result<Vec<StoredMeal>, UpstreamError> {
        self.meals_between(user, &DateRange::single(date))
    }
}

/// Per-user goal configuration
pub trait GoalStore: Send + Sync {
    /// Active goals for `user`
    fn goals(&self, user: UserId) -> Result<GoalSet, UpstreamError>;

    fn update_goals(&self, user: UserId, goals: GoalSet) -> Result<(), UpstreamError>;
}
