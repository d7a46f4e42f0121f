//! Meal record model
//!
//! A validated, immutable record of one analysed meal.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use super::{FoodItem, NutritionTotals};

/// Meal type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl FromStr for MealType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            _ => Err(Error::UnknownMealType(s.to_string())),
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nutrition for one logged meal.
///
/// Built by [`crate::nutrition::aggregate`]. When `items` is non-empty,
/// `totals` is their component-wise sum; otherwise it holds the totals
/// stated in the model response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionRecord {
    date: NaiveDate,
    meal_type: MealType,
    items: Vec<FoodItem>,
    totals: NutritionTotals,
    raw_response: String,
}

impl NutritionRecord {
    pub(crate) fn new(
        date: NaiveDate,
        meal_type: MealType,
        items: Vec<FoodItem>,
        totals: NutritionTotals,
        raw_response: String,
    ) -> Self {
        Self {
            date,
            meal_type,
            items,
            totals,
            raw_response,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn meal_type(&self) -> MealType {
        self.meal_type
    }

    pub fn items(&self) -> &[FoodItem] {
        &self.items
    }

    pub fn totals(&self) -> &NutritionTotals {
        &self.totals
    }

    pub fn raw_response(&self) -> &str {
        &self.raw_response
    }

    /// True when the analysis found nothing: no items and all-zero totals
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.totals.is_zero()
    }
}
