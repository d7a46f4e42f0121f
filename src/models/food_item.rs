//! Food Item model
//!
//! A single food identified in a meal, with its estimated nutrition.

use serde::{Deserialize, Serialize};

use super::NutritionTotals;

/// A food item as estimated by the vision model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    #[serde(default)]
    pub sugar_g: f64,
    #[serde(default)]
    pub fiber_g: f64,
}

impl FoodItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// This item's nutrition as a totals record
    pub fn totals(&self) -> NutritionTotals {
        NutritionTotals {
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
            sugar_g: self.sugar_g,
            fiber_g: self.fiber_g,
        }
    }
}
