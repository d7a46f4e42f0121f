//! Goal and Progress MCP Tools

use serde::Serialize;

use crate::models::{DateRange, GoalPreset, GoalSet, NutritionTotals, ProgressSummary, Ratios};
use crate::service::MealAnalyzer;
use crate::upstream::{GoalStore, MealStore, UserId};
use super::parse_date;

/// Windows offered by the progress view
const PROGRESS_WINDOWS: [u32; 3] = [7, 14, 30];

/// Response for update_goals and apply_goal_preset
#[derive(Debug, Serialize)]
pub struct UpdateGoalsResponse {
    pub goals: GoalSet,
    pub preset: Option<String>,
}

/// Response for evaluate_progress
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub start_date: String,
    pub end_date: String,
    pub days: u32,
    pub goals: GoalSet,
    pub average_actual: NutritionTotals,
    pub average_ratios: Ratios,
    /// Average ratios limited to 0..=1 for progress bars
    pub display_ratios: Ratios,
    pub insights: Vec<String>,
    pub has_data: bool,
    pub summary: ProgressSummary,
}

pub fn get_goals<S: MealStore + GoalStore>(
    analyzer: &MealAnalyzer<S>,
    user: UserId,
) -> Result<GoalSet, String> {
    analyzer
        .goals(user)
        .map_err(|e| format!("Failed to get goals: {}", e))
}

pub fn update_goals<S: MealStore + GoalStore>(
    analyzer: &MealAnalyzer<S>,
    user: UserId,
    goals: GoalSet,
) -> Result<UpdateGoalsResponse, String> {
    let goals = analyzer
        .update_goals(user, goals)
        .map_err(|e| format!("Failed to update goals: {}", e))?;
    Ok(UpdateGoalsResponse {
        goals,
        preset: None,
    })
}

pub fn apply_goal_preset<S: MealStore + GoalStore>(
    analyzer: &MealAnalyzer<S>,
    user: UserId,
    preset: &str,
) -> Result<UpdateGoalsResponse, String> {
    let preset: GoalPreset = preset.parse().map_err(|e| format!("{}", e))?;
    let goals = analyzer
        .apply_preset(user, preset)
        .map_err(|e| format!("Failed to apply preset: {}", e))?;
    Ok(UpdateGoalsResponse {
        goals,
        preset: Some(preset.as_str().to_string()),
    })
}

/// Progress over the `days` dates ending on `end_date` (default today)
pub fn evaluate_progress<S: MealStore + GoalStore>(
    analyzer: &MealAnalyzer<S>,
    user: UserId,
    end_date: Option<&str>,
    days: u32,
) -> Result<ProgressResponse, String> {
    if !PROGRESS_WINDOWS.contains(&days) {
        return Err(format!(
            "Unsupported window of {} days (use one of {:?})",
            days, PROGRESS_WINDOWS
        ));
    }
    let end = parse_date(end_date)?;
    let window = DateRange::ending_on(end, days).map_err(|e| e.to_string())?;

    let summary = analyzer
        .progress(user, window)
        .map_err(|e| format!("Failed to evaluate progress: {}", e))?;

    Ok(ProgressResponse {
        start_date: window.start().to_string(),
        end_date: window.end().to_string(),
        days,
        goals: summary.goals,
        average_actual: summary.average_actual,
        average_ratios: summary.average_ratios,
        display_ratios: summary.average_ratios.clamped(),
        insights: summary.insights.iter().map(ToString::to_string).collect(),
        has_data: !summary.has_no_data(),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::tools::meals::log_meal_analysis;
    use crate::upstream::MemoryStore;

    fn analyzer() -> MealAnalyzer<MemoryStore> {
        MealAnalyzer::new(Arc::new(MemoryStore::default()))
    }

    #[test]
    fn test_apply_preset_and_get() {
        let analyzer = analyzer();
        let response = apply_goal_preset(&analyzer, UserId(1), "Muscle Gain").unwrap();
        assert_eq!(response.preset.as_deref(), Some("muscle_gain"));
        assert_eq!(get_goals(&analyzer, UserId(1)).unwrap().calorie_goal, 2600);
        assert!(apply_goal_preset(&analyzer, UserId(1), "cut").is_err());
    }

    #[test]
    fn test_update_goals_out_of_range() {
        let err = update_goals(&analyzer(), UserId(1), GoalSet::new(6000, 150, 250, 65)).unwrap_err();
        assert!(err.contains("calorie"));
    }

    #[test]
    fn test_evaluate_progress_week() {
        let analyzer = analyzer();
        let user = UserId(5);
        for day in 1..=7 {
            let date = format!("2025-09-{:02}", day);
            log_meal_analysis(
                &analyzer,
                user,
                "Total Calories: 2600\nTotal Protein: 160g",
                "dinner",
                Some(&date),
            )
            .unwrap();
        }

        let progress = evaluate_progress(&analyzer, user, Some("2025-09-07"), 7).unwrap();
        assert_eq!(progress.start_date, "2025-09-01");
        assert!((progress.average_ratios.calories - 1.3).abs() < 1e-9);
        assert_eq!(progress.display_ratios.calories, 1.0);
        assert_eq!(progress.insights, vec!["reduce portions".to_string()]);
        assert!(progress.has_data);
    }

    #[test]
    fn test_evaluate_progress_window_before_earliest_date() {
        let err = evaluate_progress(&analyzer(), UserId(1), Some("-262143-01-03"), 7).unwrap_err();
        assert!(err.contains("Invalid date range"));
    }

    #[test]
    fn test_evaluate_progress_rejects_odd_window() {
        assert!(evaluate_progress(&analyzer(), UserId(1), Some("2025-09-07"), 10).is_err());
    }
}
