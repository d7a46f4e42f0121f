//! Runtime configuration
//!
//! Read once from environment variables at startup.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::models::GoalSet;

pub const DATABASE_PATH_VAR: &str = "NUTRITRACK_DATABASE_PATH";
pub const LOG_LEVEL_VAR: &str = "NUTRITRACK_LOG_LEVEL";
pub const CALORIE_GOAL_VAR: &str = "NUTRITRACK_DEFAULT_CALORIE_GOAL";
pub const PROTEIN_GOAL_VAR: &str = "NUTRITRACK_DEFAULT_PROTEIN_GOAL";
pub const CARB_GOAL_VAR: &str = "NUTRITRACK_DEFAULT_CARB_GOAL";
pub const FAT_GOAL_VAR: &str = "NUTRITRACK_DEFAULT_FAT_GOAL";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Level for the `nutritrack` tracing directive
    pub log_level: String,
    /// Goals for users that have not set their own
    pub default_goals: GoalSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: "info".to_string(),
            default_goals: GoalSet::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup. Unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(DATABASE_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            config.database_path = PathBuf::from(path.trim());
        }

        if let Some(level) = lookup(LOG_LEVEL_VAR) {
            let level = level.trim().to_lowercase();
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError {
                    var: LOG_LEVEL_VAR,
                    value: level,
                });
            }
            config.log_level = level;
        }

        let goals = &mut config.default_goals;
        read_goal(&lookup, CALORIE_GOAL_VAR, &mut goals.calorie_goal)?;
        read_goal(&lookup, PROTEIN_GOAL_VAR, &mut goals.protein_goal_g)?;
        read_goal(&lookup, CARB_GOAL_VAR, &mut goals.carb_goal_g)?;
        read_goal(&lookup, FAT_GOAL_VAR, &mut goals.fat_goal_g)?;

        Ok(config)
    }
}

/// `data/nutritrack.db` next to the executable, or at the project root when
/// running from `target/release` or `target/debug`
fn default_database_path() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    database_path_under(exe_dir)
}

fn database_path_under(mut path: PathBuf) -> PathBuf {
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(root) = path.parent().and_then(|target| target.parent()) {
            path = root.to_path_buf();
        }
    }
    path.push("data");
    path.push("nutritrack.db");
    path
}

fn read_goal<F>(lookup: &F, var: &'static str, target: &mut u32) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(var) {
        *target = raw
            .trim()
            .parse()
            .ok()
            .filter(|v| *v > 0)
            .ok_or(ConfigError { var, value: raw })?;
    }
    Ok(())
}
