//! Meal MCP Tools
//!
//! Tools for parsing model responses and logging meals.

use serde::Serialize;

use crate::error::ParseWarning;
use crate::models::{
    DateRange, FoodItem, MacroBreakdown, MealType, NutritionTotals, ProgressReport,
};
use crate::nutrition::{parse, ExtractionTier};
use crate::service::MealAnalyzer;
use crate::upstream::{GoalStore, MealStore, StoredMeal, UserId};
use super::parse_date;

/// Response for parse_response
#[derive(Debug, Serialize)]
pub struct ParsePreview {
    pub tier: ExtractionTier,
    pub items: Vec<FoodItem>,
    pub stated_totals: NutritionTotals,
    /// Totals a logged record would carry
    pub effective_totals: NutritionTotals,
    pub macro_breakdown: MacroBreakdown,
    pub warnings: Vec<ParseWarning>,
}

/// Response for log_meal_analysis
#[derive(Debug, Serialize)]
pub struct LogMealResponse {
    pub saved: bool,
    pub meal_id: Option<i64>,
    pub date: String,
    pub meal_type: String,
    pub tier: ExtractionTier,
    pub items: Vec<FoodItem>,
    pub totals: NutritionTotals,
    pub warnings: Vec<ParseWarning>,
    pub message: String,
}

/// Meal summary for listing
#[derive(Debug, Serialize)]
pub struct MealSummary {
    pub id: i64,
    pub date: String,
    pub logged_at: String,
    pub meal_type: String,
    pub item_count: usize,
    pub totals: NutritionTotals,
}

/// Meals organized by type
#[derive(Debug, Default, Serialize)]
pub struct DayMeals {
    pub breakfast: Vec<MealSummary>,
    pub lunch: Vec<MealSummary>,
    pub dinner: Vec<MealSummary>,
    pub snack: Vec<MealSummary>,
}

/// Response for get_day
#[derive(Debug, Serialize)]
pub struct DayDetail {
    pub date: String,
    pub meals: DayMeals,
    pub macro_breakdown: MacroBreakdown,
    pub progress: ProgressReport,
}

/// Response for list_meals
#[derive(Debug, Serialize)]
pub struct ListMealsResponse {
    pub start_date: String,
    pub end_date: String,
    pub meals: Vec<MealSummary>,
    pub total: usize,
}

/// Response for get_meal_analysis
#[derive(Debug, Serialize)]
pub struct MealAnalysisResponse {
    pub id: i64,
    pub date: String,
    pub meal_type: String,
    pub items: Vec<FoodItem>,
    pub totals: NutritionTotals,
    pub analysis: String,
}

fn summarize(meal: &StoredMeal) -> MealSummary {
    MealSummary {
        id: meal.id.0,
        date: meal.record.date().to_string(),
        logged_at: meal.logged_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        meal_type: meal.record.meal_type().as_str().to_string(),
        item_count: meal.record.items().len(),
        totals: *meal.record.totals(),
    }
}

// ============================================================================
// Meal Tools
// ============================================================================

/// Parse a model response without saving anything
pub fn parse_response(response_text: &str) -> ParsePreview {
    let parsed = parse(response_text);
    let effective_totals: NutritionTotals = if parsed.items.is_empty() {
        parsed.stated_totals
    } else {
        parsed.items.iter().map(FoodItem::totals).sum()
    };

    ParsePreview {
        tier: parsed.tier,
        macro_breakdown: effective_totals.macro_breakdown(),
        effective_totals,
        items: parsed.items,
        stated_totals: parsed.stated_totals,
        warnings: parsed.warnings,
    }
}

/// Parse a model response and log it as a meal
pub fn log_meal_analysis<S: MealStore + GoalStore>(
    analyzer: &MealAnalyzer<S>,
    user: UserId,
    response_text: &str,
    meal_type: &str,
    date: Option<&str>,
) -> Result<LogMealResponse, String> {
    let meal_type: MealType = meal_type.parse().map_err(|e| format!("{}", e))?;
    let date = parse_date(date)?;

    let outcome = analyzer
        .record_response(user, response_text, meal_type, date)
        .map_err(|e| format!("Failed to log meal: {}", e))?;

    let message = if outcome.nothing_detected {
        "No nutrition data found in the response; nothing was saved".to_string()
    } else {
        format!(
            "Logged {} with {:.0} kcal",
            meal_type,
            outcome.record.totals().calories
        )
    };

    Ok(LogMealResponse {
        saved: outcome.meal_id.is_some(),
        meal_id: outcome.meal_id.map(|id| id.0),
        date: date.to_string(),
        meal_type: meal_type.as_str().to_string(),
        tier: outcome.tier,
        items: outcome.record.items().to_vec(),
        totals: *outcome.record.totals(),
        warnings: outcome.warnings,
        message,
    })
}

/// A day's meals grouped by type, with progress against goals
pub fn get_day<S: MealStore + GoalStore>(
    analyzer: &MealAnalyzer<S>,
    user: UserId,
    date: Option<&str>,
) -> Result<DayDetail, String> {
    let date = parse_date(date)?;

    let entries = analyzer
        .store()
        .meals_on(user, date)
        .map_err(|e| format!("Failed to get meals: {}", e))?;
    let progress = analyzer
        .day_progress(user, date)
        .map_err(|e| format!("Failed to evaluate day: {}", e))?;

    let mut meals = DayMeals::default();
    for entry in &entries {
        let summary = summarize(entry);
        match entry.record.meal_type() {
            MealType::Breakfast => meals.breakfast.push(summary),
            MealType::Lunch => meals.lunch.push(summary),
            MealType::Dinner => meals.dinner.push(summary),
            MealType::Snack => meals.snack.push(summary),
        }
    }

    Ok(DayDetail {
        date: date.to_string(),
        meals,
        macro_breakdown: progress.actual.macro_breakdown(),
        progress,
    })
}

/// List meals between two dates, inclusive. `end_date` defaults to today
/// and `start_date` to `end_date`.
pub fn list_meals<S: MealStore + GoalStore>(
    analyzer: &MealAnalyzer<S>,
    user: UserId,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<ListMealsResponse, String> {
    let end = parse_date(end_date)?;
    let start = match start_date {
        Some(_) => parse_date(start_date)?,
        None => end,
    };
    let range = DateRange::new(start, end).map_err(|e| e.to_string())?;

    let meals = analyzer
        .store()
        .meals_between(user, &range)
        .map_err(|e| format!("Failed to list meals: {}", e))?;
    let summaries: Vec<MealSummary> = meals.iter().map(summarize).collect();

    Ok(ListMealsResponse {
        start_date: start.to_string(),
        end_date: end.to_string(),
        total: summaries.len(),
        meals: summaries,
    })
}

/// Full stored analysis for one meal, including the raw model text
pub fn get_meal_analysis<S: MealStore + GoalStore>(
    analyzer: &MealAnalyzer<S>,
    user: UserId,
    meal_id: i64,
    date: Option<&str>,
) -> Result<Option<MealAnalysisResponse>, String> {
    let date = parse_date(date)?;
    let meals = analyzer
        .store()
        .meals_on(user, date)
        .map_err(|e| format!("Failed to get meals: {}", e))?;

    Ok(meals.into_iter().find(|m| m.id.0 == meal_id).map(|m| MealAnalysisResponse {
        id: m.id.0,
        date: m.record.date().to_string(),
        meal_type: m.record.meal_type().as_str().to_string(),
        items: m.record.items().to_vec(),
        totals: *m.record.totals(),
        analysis: m.record.raw_response().to_string(),
    }))
}
