//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!(version = 1, "Applied schema migration");
    }

    Ok(())
}

/// Migration v1: meals, their items, and per-user goals
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- MEALS
        -- One analysed meal; totals are the resolved record totals
        -- ============================================
        CREATE TABLE meals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            meal_date TEXT NOT NULL,             -- YYYY-MM-DD
            meal_type TEXT NOT NULL CHECK(meal_type IN ('breakfast', 'lunch', 'dinner', 'snack')),
            logged_at TEXT NOT NULL,             -- UTC, YYYY-MM-DD HH:MM:SS.f

            calories REAL NOT NULL DEFAULT 0,
            protein REAL NOT NULL DEFAULT 0,     -- grams
            carbs REAL NOT NULL DEFAULT 0,       -- grams
            fat REAL NOT NULL DEFAULT 0,         -- grams
            sugar REAL NOT NULL DEFAULT 0,       -- grams
            fiber REAL NOT NULL DEFAULT 0,       -- grams

            raw_response TEXT NOT NULL
        );

        CREATE INDEX idx_meals_user_date ON meals(user_id, meal_date);

        -- ============================================
        -- MEAL ITEMS
        -- Per-food rows from structured analyses
        -- ============================================
        CREATE TABLE meal_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            calories REAL NOT NULL DEFAULT 0,
            protein REAL NOT NULL DEFAULT 0,
            carbs REAL NOT NULL DEFAULT 0,
            fat REAL NOT NULL DEFAULT 0,
            sugar REAL NOT NULL DEFAULT 0,
            fiber REAL NOT NULL DEFAULT 0,
            UNIQUE(meal_id, position)
        );

        -- ============================================
        -- USER GOALS
        -- Users without a row get the configured defaults
        -- ============================================
        CREATE TABLE user_goals (
            user_id INTEGER PRIMARY KEY,
            calorie_goal INTEGER NOT NULL,
            protein_goal INTEGER NOT NULL,
            carb_goal INTEGER NOT NULL,
            fat_goal INTEGER NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}
