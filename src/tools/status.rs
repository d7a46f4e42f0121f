//! NutriTrack Status Tool
//!
//! Provides runtime status information about the NutriTrack service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;

/// Meal logging instructions for AI assistants
pub const MEAL_INSTRUCTIONS: &str = r#"
# NutriTrack Meal Logging Instructions

## Workflow

1. Call `analysis_prompt` (optionally with the user's note, e.g. "large portion").
2. Analyze the meal photo with that prompt. Keep the table columns in order:
   Item | Portion Size | Calories | Protein | Carbs | Fat | Fiber | Sugar
   and finish with the labeled totals (Total Calories, Total Protein, ...).
3. Optionally check the text with `analyze_response`. Nothing is saved.
4. Save it with `log_meal`, passing the full response text and the meal type
   (breakfast, lunch, dinner or snack).

## How totals are chosen

1. A JSON object with a `foodItems` array (bare or in a ```json block) gives
   per-item records. Their sum is the meal total; any stated totals are ignored.
2. Otherwise, labeled lines ("Total Calories: 450", "Total Protein: 30g") are
   used. The first number on the line counts, and the last such line wins.
3. Only when no labeled calorie total is found are the markdown table rows
   summed (Calories, Protein, Carbs, Fat columns). Labeled protein, carbs or
   fat still win over the table sums. A "Total" summary row is not counted.

- Table rows become totals only; they are not stored as separate items.
- Rows with non-numeric cells are skipped and reported as warnings.
- A response with no recognizable numbers is reported but not saved.
- Any negative value rejects the whole meal.

## Progress

- `get_day` shows one day's meals against the user's goals.
- `evaluate_progress` averages a 7, 14 or 30 day window and suggests changes
  when calories fall outside 80-120% of goal or protein is below 80%.
- Goals: `get_goals`, `update_goals`, `apply_goal_preset`
  (weight_loss, maintenance, muscle_gain).

Dates use ISO format: YYYY-MM-DD and default to today.
"#;

/// Runtime status of the NutriTrack service
#[derive(Debug, Clone, Serialize)]
pub struct NutritrackStatus {
    /// Build information
    pub build: String,
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Store information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub stored_meals: Option<usize>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status. `stored_meals` is `None` when the store
    /// could not be read.
    pub fn get_status(&self, stored_meals: Option<usize>) -> NutritrackStatus {
        let build_info = BuildInfo::current();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        NutritrackStatus {
            build: build_info.label(),
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            stored_meals,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
