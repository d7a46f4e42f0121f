//! Shared nutrition totals
//!
//! Used by food items, meal records, and daily progress.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// kcal per gram of protein
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
/// kcal per gram of carbohydrate
pub const KCAL_PER_G_CARBS: f64 = 4.0;
/// kcal per gram of fat
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Nutritional totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub sugar_g: f64,
    pub fiber_g: f64,
}

impl NutritionTotals {
    /// All zeros
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale every field by a multiplier
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            calories: self.calories * multiplier,
            protein_g: self.protein_g * multiplier,
            carbs_g: self.carbs_g * multiplier,
            fat_g: self.fat_g * multiplier,
            sugar_g: self.sugar_g * multiplier,
            fiber_g: self.fiber_g * multiplier,
        }
    }

    /// Component-wise sum
    pub fn add(&self, other: &NutritionTotals) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein_g: self.protein_g + other.protein_g,
            carbs_g: self.carbs_g + other.carbs_g,
            fat_g: self.fat_g + other.fat_g,
            sugar_g: self.sugar_g + other.sugar_g,
            fiber_g: self.fiber_g + other.fiber_g,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.fields().iter().all(|(_, v)| *v == 0.0)
    }

    /// Field names paired with values, in declaration order
    pub fn fields(&self) -> [(&'static str, f64); 6] {
        [
            ("calories", self.calories),
            ("protein_g", self.protein_g),
            ("carbs_g", self.carbs_g),
            ("fat_g", self.fat_g),
            ("sugar_g", self.sugar_g),
            ("fiber_g", self.fiber_g),
        ]
    }

    /// Reject negative or non-finite fields. `prefix` is prepended to the field name.
    pub fn validate(&self, prefix: &str) -> Result<(), ValidationError> {
        for (name, value) in self.fields() {
            let field = format!("{}{}", prefix, name);
            if !value.is_finite() {
                return Err(ValidationError::NotFinite { field });
            }
            if value < 0.0 {
                return Err(ValidationError::Negative { field, value });
            }
        }
        Ok(())
    }

    /// Calories split across the macronutrients
    pub fn macro_breakdown(&self) -> MacroBreakdown {
        MacroBreakdown::from_totals(self)
    }
}

impl std::ops::Add for NutritionTotals {
    type Output = NutritionTotals;

    fn add(self, other: NutritionTotals) -> NutritionTotals {
        NutritionTotals::add(&self, &other)
    }
}

impl std::ops::Mul<f64> for NutritionTotals {
    type Output = NutritionTotals;

    fn mul(self, multiplier: f64) -> NutritionTotals {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for NutritionTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(NutritionTotals::zero(), |acc, n| acc + n)
    }
}

impl<'a> std::iter::Sum<&'a NutritionTotals> for NutritionTotals {
    fn sum<I: Iterator<Item = &'a NutritionTotals>>(iter: I) -> Self {
        iter.fold(NutritionTotals::zero(), |acc, n| acc + *n)
    }
}

/// Calories contributed by each macronutrient
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroBreakdown {
    pub protein_kcal: f64,
    pub carbs_kcal: f64,
    pub fat_kcal: f64,
    /// Percent of macro calories, 0-100. Zero when there are no macro calories.
    pub protein_pct: f64,
    pub carbs_pct: f64,
    pub fat_pct: f64,
}

impl MacroBreakdown {
    pub fn from_totals(totals: &NutritionTotals) -> Self {
        let protein_kcal = totals.protein_g * KCAL_PER_G_PROTEIN;
        let carbs_kcal = totals.carbs_g * KCAL_PER_G_CARBS;
        let fat_kcal = totals.fat_g * KCAL_PER_G_FAT;
        let sum = protein_kcal + carbs_kcal + fat_kcal;

        let pct = |kcal: f64| if sum > 0.0 { kcal / sum * 100.0 } else { 0.0 };

        Self {
            protein_kcal,
            carbs_kcal,
            fat_kcal,
            protein_pct: pct(protein_kcal),
            carbs_pct: pct(carbs_kcal),
            fat_pct: pct(fat_kcal),
        }
    }

    /// Sum of macro calories
    pub fn total_kcal(&self) -> f64 {
        self.protein_kcal + self.carbs_kcal + self.fat_kcal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NutritionTotals {
        NutritionTotals {
            calories: 500.0,
            protein_g: 30.0,
            carbs_g: 50.0,
            fat_g: 20.0,
            sugar_g: 5.0,
            fiber_g: 8.0,
        }
    }

    #[test]
    fn test_sum_and_scale() {
        let total: NutritionTotals = vec![sample(), sample()].into_iter().sum();
        assert_eq!(total, sample() * 2.0);
        assert!((total.fiber_g - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_negative() {
        let mut t = sample();
        t.fat_g = -1.0;
        let err = t.validate("totals.").unwrap_err();
        assert_eq!(err.field(), "totals.fat_g");
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut t = sample();
        t.calories = f64::NAN;
        assert!(matches!(
            t.validate(""),
            Err(ValidationError::NotFinite { .. })
        ));
    }

    #[test]
    fn test_macro_breakdown() {
        let b = sample().macro_breakdown();
        assert!((b.protein_kcal - 120.0).abs() < 1e-9);
        assert!((b.carbs_kcal - 200.0).abs() < 1e-9);
        assert!((b.fat_kcal - 180.0).abs() < 1e-9);
        assert!((b.protein_pct + b.carbs_pct + b.fat_pct - 100.0).abs() < 1e-9);
        assert!((b.fat_pct - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_macro_breakdown_empty() {
        let b = NutritionTotals::zero().macro_breakdown();
        assert_eq!(b.total_kcal(), 0.0);
        assert_eq!(b.protein_pct, 0.0);
    }
}
