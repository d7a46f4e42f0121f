//! Daily nutrition goals
//!
//! Per-user targets the evaluator compares intake against.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GoalError;

const CALORIE_BOUNDS: (u32, u32) = (1000, 5000);
const PROTEIN_BOUNDS: (u32, u32) = (50, 300);
const CARB_BOUNDS: (u32, u32) = (50, 500);
const FAT_BOUNDS: (u32, u32) = (30, 200);

/// Daily goals. Grams for the macronutrients, kcal for calories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalSet {
    pub calorie_goal: u32,
    pub protein_goal_g: u32,
    pub carb_goal_g: u32,
    pub fat_goal_g: u32,
}

impl Default for GoalSet {
    fn default() -> Self {
        Self {
            calorie_goal: 2000,
            protein_goal_g: 150,
            carb_goal_g: 250,
            fat_goal_g: 65,
        }
    }
}

impl GoalSet {
    pub fn new(calorie_goal: u32, protein_goal_g: u32, carb_goal_g: u32, fat_goal_g: u32) -> Self {
        Self {
            calorie_goal,
            protein_goal_g,
            carb_goal_g,
            fat_goal_g,
        }
    }

    /// Check every goal against the range the goal editor accepts
    pub fn validate(&self) -> Result<(), GoalError> {
        check("calorie", self.calorie_goal, CALORIE_BOUNDS)?;
        check("protein", self.protein_goal_g, PROTEIN_BOUNDS)?;
        check("carb", self.carb_goal_g, CARB_BOUNDS)?;
        check("fat", self.fat_goal_g, FAT_BOUNDS)?;
        Ok(())
    }
}

fn check(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), GoalError> {
    if value < min || value > max {
        return Err(GoalError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Quick goal presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPreset {
    WeightLoss,
    Maintenance,
    MuscleGain,
}

impl GoalPreset {
    pub fn goals(&self) -> GoalSet {
        match self {
            GoalPreset::WeightLoss => GoalSet::new(1800, 140, 180, 60),
            GoalPreset::Maintenance => GoalSet::new(2200, 120, 275, 73),
            GoalPreset::MuscleGain => GoalSet::new(2600, 180, 325, 87),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalPreset::WeightLoss => "weight_loss",
            GoalPreset::Maintenance => "maintenance",
            GoalPreset::MuscleGain => "muscle_gain",
        }
    }
}

impl FromStr for GoalPreset {
    type Err = GoalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "weight_loss" => Ok(GoalPreset::WeightLoss),
            "maintenance" => Ok(GoalPreset::Maintenance),
            "muscle_gain" => Ok(GoalPreset::MuscleGain),
            _ => Err(GoalError::UnknownPreset(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_goals_are_valid() {
        assert!(GoalSet::default().validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        for preset in [GoalPreset::WeightLoss, GoalPreset::Maintenance, GoalPreset::MuscleGain] {
            assert!(preset.goals().validate().is_ok(), "{}", preset.as_str());
        }
    }

    #[test]
    fn test_validate_out_of_range() {
        let goals = GoalSet::new(900, 150, 250, 65);
        assert_eq!(
            goals.validate(),
            Err(GoalError::OutOfRange {
                field: "calorie",
                value: 900,
                min: 1000,
                max: 5000
            })
        );

        let goals = GoalSet::new(2000, 150, 250, 201);
        assert!(matches!(
            goals.validate(),
            Err(GoalError::OutOfRange { field: "fat", .. })
        ));
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("Weight Loss".parse::<GoalPreset>().unwrap(), GoalPreset::WeightLoss);
        assert_eq!("muscle-gain".parse::<GoalPreset>().unwrap(), GoalPreset::MuscleGain);
        assert!("bulk".parse::<GoalPreset>().is_err());
    }
}
