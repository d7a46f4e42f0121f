//! Data models
//!
//! Typed nutrition records, goals, and progress reports.

mod food_item;
mod goals;
mod meal;
mod nutrition;
mod progress;

pub use food_item::FoodItem;
pub use goals::{GoalPreset, GoalSet};
pub use meal::{MealType, NutritionRecord};
pub use nutrition::{
    MacroBreakdown, NutritionTotals, KCAL_PER_G_CARBS, KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN,
};
pub use progress::{DateRange, Insight, ProgressReport, ProgressSummary, Ratios};
