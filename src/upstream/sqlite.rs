//! SQLite store
//!
//! Durable `MealStore` and `GoalStore`. A meal and its items are written in
//! one transaction. Users without a goals row get the store's default goals.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{migrations, Database, DbError, DbResult};
use crate::error::UpstreamError;
use crate::models::{DateRange, FoodItem, GoalSet, MealType, NutritionRecord, NutritionTotals};
use super::{GoalStore, MealId, MealStore, StoredMeal, UserId};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl From<DbError> for UpstreamError {
    fn from(e: DbError) -> Self {
        UpstreamError::Store(e.to_string())
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    database: Database,
    default_goals: GoalSet,
}

/// Meal row as read, before conversion into model types
struct MealRow {
    id: i64,
    meal_date: String,
    meal_type: String,
    logged_at: String,
    totals: NutritionTotals,
    raw_response: String,
}

impl SqliteStore {
    /// Wrap an already migrated database
    pub fn new(database: Database, default_goals: GoalSet) -> Self {
        Self {
            database,
            default_goals,
        }
    }

    /// Fresh migrated in-memory store
    pub fn open_in_memory(default_goals: GoalSet) -> DbResult<Self> {
        let database = Database::in_memory()?;
        database.with_conn(migrations::run_migrations)?;
        Ok(Self::new(database, default_goals))
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Number of meals held for every user
    pub fn meal_count(&self) -> Result<usize, UpstreamError> {
        let count: i64 = self
            .database
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM meals", [], |row| row.get(0))?))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn totals_from_row(row: &rusqlite::Row<'_>, first: usize) -> rusqlite::Result<NutritionTotals> {
    Ok(NutritionTotals {
        calories: row.get(first)?,
        protein_g: row.get(first + 1)?,
        carbs_g: row.get(first + 2)?,
        fat_g: row.get(first + 3)?,
        sugar_g: row.get(first + 4)?,
        fiber_g: row.get(first + 5)?,
    })
}

fn load_items(conn: &Connection, meal_id: i64) -> DbResult<Vec<FoodItem>> {
    let mut stmt = conn.prepare(
        "SELECT name, calories, protein, carbs, fat, sugar, fiber
         FROM meal_items WHERE meal_id = ?1 ORDER BY position",
    )?;
    let items = stmt
        .query_map([meal_id], |row| {
            let totals = totals_from_row(row, 1)?;
            Ok(FoodItem {
                name: row.get(0)?,
                calories: totals.calories,
                protein_g: totals.protein_g,
                carbs_g: totals.carbs_g,
                fat_g: totals.fat_g,
                sugar_g: totals.sugar_g,
                fiber_g: totals.fiber_g,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

fn stored_meal(conn: &Connection, user: UserId, row: MealRow) -> DbResult<StoredMeal> {
    let date = NaiveDate::parse_from_str(&row.meal_date, DATE_FORMAT).map_err(|_| DbError::Corrupt {
        column: "meals.meal_date",
        value: row.meal_date.clone(),
    })?;
    let meal_type: MealType = row.meal_type.parse().map_err(|_| DbError::Corrupt {
        column: "meals.meal_type",
        value: row.meal_type.clone(),
    })?;
    let logged_at = NaiveDateTime::parse_from_str(&row.logged_at, TIMESTAMP_FORMAT).map_err(|_| {
        DbError::Corrupt {
            column: "meals.logged_at",
            value: row.logged_at.clone(),
        }
    })?;

    let items = load_items(conn, row.id)?;
    Ok(StoredMeal {
        id: MealId(row.id),
        user_id: user,
        logged_at,
        record: NutritionRecord::new(date, meal_type, items, row.totals, row.raw_response),
    })
}

impl MealStore for SqliteStore {
    fn save_meal(&self, user: UserId, record: NutritionRecord) -> Result<MealId, UpstreamError> {
        let logged_at = Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string();

        let id = self.database.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let totals = record.totals();
            tx.execute(
                "INSERT INTO meals (user_id, meal_date, meal_type, logged_at,
                                    calories, protein, carbs, fat, sugar, fiber, raw_response)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    user.0,
                    record.date().format(DATE_FORMAT).to_string(),
                    record.meal_type().as_str(),
                    logged_at,
                    totals.calories,
                    totals.protein_g,
                    totals.carbs_g,
                    totals.fat_g,
                    totals.sugar_g,
                    totals.fiber_g,
                    record.raw_response(),
                ],
            )?;
            let meal_id = tx.last_insert_rowid();

            for (position, item) in record.items().iter().enumerate() {
                tx.execute(
                    "INSERT INTO meal_items (meal_id, position, name,
                                             calories, protein, carbs, fat, sugar, fiber)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        meal_id,
                        position as i64,
                        item.name,
                        item.calories,
                        item.protein_g,
                        item.carbs_g,
                        item.fat_g,
                        item.sugar_g,
                        item.fiber_g,
                    ],
                )?;
            }

            tx.commit()?;
            Ok(meal_id)
        })?;

        tracing::debug!(user = %user, meal_id = id, items = record.items().len(), "Saved meal");
        Ok(MealId(id))
    }

    fn meals_between(&self, user: UserId, range: &DateRange) -> Result<Vec<StoredMeal>, UpstreamError> {
        let meals: Vec<StoredMeal> = self.database.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, meal_date, meal_type, logged_at,
                        calories, protein, carbs, fat, sugar, fiber, raw_response
                 FROM meals
                 WHERE user_id = ?1 AND meal_date BETWEEN ?2 AND ?3
                 ORDER BY meal_date, logged_at, id",
            )?;
            let rows = stmt
                .query_map(
                    params![
                        user.0,
                        range.start().format(DATE_FORMAT).to_string(),
                        range.end().format(DATE_FORMAT).to_string(),
                    ],
                    |row| {
                        Ok(MealRow {
                            id: row.get(0)?,
                            meal_date: row.get(1)?,
                            meal_type: row.get(2)?,
                            logged_at: row.get(3)?,
                            totals: totals_from_row(row, 4)?,
                            raw_response: row.get(10)?,
                        })
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(|row| stored_meal(conn, user, row)).collect()
        })?;
        Ok(meals)
    }
}

impl GoalStore for SqliteStore {
    fn goals(&self, user: UserId) -> Result<GoalSet, UpstreamError> {
        let stored: Option<GoalSet> = self.database.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT calorie_goal, protein_goal, carb_goal, fat_goal
                     FROM user_goals WHERE user_id = ?1",
                    [user.0],
                    |row| Ok(GoalSet::new(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()?)
        })?;
        Ok(stored.unwrap_or(self.default_goals))
    }

    fn update_goals(&self, user: UserId, goals: GoalSet) -> Result<(), UpstreamError> {
        self.database.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_goals (user_id, calorie_goal, protein_goal, carb_goal, fat_goal)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                    calorie_goal = excluded.calorie_goal,
                    protein_goal = excluded.protein_goal,
                    carb_goal = excluded.carb_goal,
                    fat_goal = excluded.fat_goal,
                    updated_at = datetime('now')",
                params![
                    user.0,
                    goals.calorie_goal,
                    goals.protein_goal_g,
                    goals.carb_goal_g,
                    goals.fat_goal_g,
                ],
            )?;
            Ok(())
        })?;
        tracing::info!(user = %user, calorie_goal = goals.calorie_goal, "Updated goals");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::nutrition::{aggregate, parse};

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory(GoalSet::default()).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, day).unwrap()
    }

    fn record(text: &str, meal_type: MealType, day: u32) -> NutritionRecord {
        aggregate(parse(text), meal_type, date(day)).unwrap()
    }

    #[test]
    fn test_meal_round_trips_with_items() {
        let store = store();
        let original = record(
            r#"{"foodItems": [
                {"item": "Oats", "calories": 150, "protein": 5, "carbs": 27, "fat": 3, "fiber": 4},
                {"item": "Blueberries", "calories": 42, "carbs": 11, "sugar": 7.4}
            ]}"#,
            MealType::Breakfast,
            3,
        );

        let id = store.save_meal(UserId(1), original.clone()).unwrap();
        let meals = store.meals_on(UserId(1), date(3)).unwrap();

        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].id, id);
        assert_eq!(meals[0].record, original);
        assert_eq!(meals[0].record.items()[1].name, "Blueberries");
    }

    #[test]
    fn test_meals_are_scoped_per_user_and_range() {
        let store = store();
        store.save_meal(UserId(1), record("Total Calories: 500", MealType::Lunch, 3)).unwrap();
        store.save_meal(UserId(1), record("Total Calories: 300", MealType::Lunch, 1)).unwrap();
        store.save_meal(UserId(1), record("Total Calories: 700", MealType::Lunch, 9)).unwrap();
        store.save_meal(UserId(2), record("Total Calories: 999", MealType::Lunch, 2)).unwrap();

        let range = DateRange::new(date(1), date(7)).unwrap();
        let calories: Vec<f64> = store
            .meals_between(UserId(1), &range)
            .unwrap()
            .iter()
            .map(|m| m.record.totals().calories)
            .collect();
        assert_eq!(calories, vec![300.0, 500.0]);
        assert_eq!(store.meal_count().unwrap(), 4);
    }

    #[test]
    fn test_goals_default_then_upsert() {
        let store = store();
        assert_eq!(store.goals(UserId(7)).unwrap(), GoalSet::default());

        store.update_goals(UserId(7), GoalSet::new(1800, 140, 180, 60)).unwrap();
        store.update_goals(UserId(7), GoalSet::new(2600, 180, 325, 87)).unwrap();
        assert_eq!(store.goals(UserId(7)).unwrap(), GoalSet::new(2600, 180, 325, 87));
        assert_eq!(store.goals(UserId(8)).unwrap(), GoalSet::default());
    }

    #[test]
    fn test_corrupt_row_is_store_error() {
        let store = store();
        store
            .database()
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO meals (user_id, meal_date, meal_type, logged_at, raw_response)
                     VALUES (1, '2025-05-04', 'lunch', 'yesterday', '')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let err = store.meals_on(UserId(1), date(4)).unwrap_err();
        assert!(matches!(err, UpstreamError::Store(ref m) if m.contains("logged_at")));
    }
}
