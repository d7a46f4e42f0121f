//! Progress models
//!
//! Derived comparisons of intake against goals. Recomputed on demand.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use super::{GoalSet, NutritionTotals};

/// Inclusive range of calendar dates. Only built through the checked
/// constructors, so `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// The `days` dates ending on `end`, inclusive. Zero is treated as one.
    /// Fails when the window would start before the earliest representable date.
    pub fn ending_on(end: NaiveDate, days: u32) -> Result<Self> {
        let back = u64::from(days.max(1)) - 1;
        let start = end.checked_sub_days(Days::new(back)).ok_or(Error::InvalidRange {
            start: NaiveDate::MIN,
            end,
        })?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of dates in the range (always at least one)
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Every date in the range, ascending
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// Actual intake divided by goal. Stored unclamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ratios {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Ratios {
    /// Ratios of `actual` against `goals`; a zero goal yields a zero ratio
    pub fn of(actual: &NutritionTotals, goals: &GoalSet) -> Self {
        Self {
            calories: ratio(actual.calories, goals.calorie_goal),
            protein: ratio(actual.protein_g, goals.protein_goal_g),
            carbs: ratio(actual.carbs_g, goals.carb_goal_g),
            fat: ratio(actual.fat_g, goals.fat_goal_g),
        }
    }

    /// Ratios limited to `[0, 1]` for progress-bar display
    pub fn clamped(&self) -> Self {
        Self {
            calories: self.calories.clamp(0.0, 1.0),
            protein: self.protein.clamp(0.0, 1.0),
            carbs: self.carbs.clamp(0.0, 1.0),
            fat: self.fat.clamp(0.0, 1.0),
        }
    }
}

fn ratio(actual: f64, goal: u32) -> f64 {
    if goal > 0 {
        actual / f64::from(goal)
    } else {
        0.0
    }
}

/// Recommendation derived from average goal ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Insight {
    IncreaseCalories,
    ReducePortions,
    IncreaseProtein,
}

impl Insight {
    pub fn message(&self) -> &'static str {
        match self {
            Insight::IncreaseCalories => "increase calorie intake",
            Insight::ReducePortions => "reduce portions",
            Insight::IncreaseProtein => "increase protein intake",
        }
    }
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// One day's intake against goals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub date: NaiveDate,
    pub actual: NutritionTotals,
    pub goals: GoalSet,
    pub ratios: Ratios,
    pub insights: Vec<Insight>,
    /// Number of meals logged on this date
    pub meal_count: usize,
}

/// Intake against goals across a window of days
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub window: DateRange,
    pub goals: GoalSet,
    pub days: Vec<ProgressReport>,
    pub average_actual: NutritionTotals,
    pub average_ratios: Ratios,
    pub insights: Vec<Insight>,
}

impl ProgressSummary {
    /// True when no meal was logged anywhere in the window
    pub fn has_no_data(&self) -> bool {
        self.days.iter().all(|d| d.meal_count == 0)
    }
}
