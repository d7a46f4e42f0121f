//! In-memory store
//!
//! Thread-safe `MealStore` and `GoalStore` backed by a `RwLock`. Users
//! without saved goals get the store's default goals.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::error::UpstreamError;
use crate::models::{DateRange, GoalSet, NutritionRecord};
use super::{GoalStore, MealId, MealStore, StoredMeal, UserId};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    meals: Vec<StoredMeal>,
    goals: HashMap<UserId, GoalSet>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    default_goals: GoalSet,
}

impl MemoryStore {
    pub fn new(default_goals: GoalSet) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            default_goals,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, UpstreamError> {
        self.inner
            .read()
            .map_err(|_| UpstreamError::Store("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, UpstreamError> {
        self.inner
            .write()
            .map_err(|_| UpstreamError::Store("store lock poisoned".to_string()))
    }

    /// Number of meals held for every user
    pub fn meal_count(&self) -> Result<usize, UpstreamError> {
        Ok(self.read()?.meals.len())
    }
}

impl MealStore for MemoryStore {
    fn save_meal(&self, user: UserId, record: NutritionRecord) -> Result<MealId, UpstreamError> {
        let mut inner = self.write()?;
        inner.next_id += 1;
        let id = MealId(inner.next_id);

        inner.meals.push(StoredMeal {
            id,
            user_id: user,
            logged_at: Utc::now().naive_utc(),
            record,
        });

        tracing::debug!(user = %user, meal_id = id.0, "Saved meal");
        Ok(id)
    }

    fn meals_between(&self, user: UserId, range: &DateRange) -> Result<Vec<StoredMeal>, UpstreamError> {
        let inner = self.read()?;
        let mut meals: Vec<StoredMeal> = inner
            .meals
            .iter()
            .filter(|m| m.user_id == user && range.contains(m.record.date()))
            .cloned()
            .collect();
        meals.sort_by_key(|m| (m.record.date(), m.logged_at, m.id));
        Ok(meals)
    }
}

impl GoalStore for MemoryStore {
    fn goals(&self, user: UserId) -> Result<GoalSet, UpstreamError> {
        let inner = self.read()?;
        Ok(inner.goals.get(&user).copied().unwrap_or(self.default_goals))
    }

    fn update_goals(&self, user: UserId, goals: GoalSet) -> Result<(), UpstreamError> {
        self.write()?.goals.insert(user, goals);
        tracing::info!(user = %user, calorie_goal = goals.calorie_goal, "Updated goals");
        Ok(())
    }
}
