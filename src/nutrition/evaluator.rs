//! Goal evaluation
//!
//! Compares per-day intake with a `GoalSet` and derives insights.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{
    DateRange, GoalSet, Insight, NutritionRecord, NutritionTotals, ProgressReport,
    ProgressSummary, Ratios,
};

/// Below this average calorie ratio, suggest eating more
pub const CALORIE_LOW_RATIO: f64 = 0.80;
/// Above this average calorie ratio, suggest smaller portions
pub const CALORIE_HIGH_RATIO: f64 = 1.20;
/// Below this average protein ratio, suggest more protein
pub const PROTEIN_LOW_RATIO: f64 = 0.80;

/// Insights for a set of ratios, in fixed order: calorie-low, calorie-high, protein-low
pub fn insights_for(ratios: &Ratios) -> Vec<Insight> {
    let mut insights = Vec::new();

    if ratios.calories < CALORIE_LOW_RATIO {
        insights.push(Insight::IncreaseCalories);
    } else if ratios.calories > CALORIE_HIGH_RATIO {
        insights.push(Insight::ReducePortions);
    }

    if ratios.protein < PROTEIN_LOW_RATIO {
        insights.push(Insight::IncreaseProtein);
    }

    insights
}

#[derive(Default)]
struct DayIntake {
    totals: NutritionTotals,
    meals: usize,
}

/// Sum record totals per date, keeping only dates inside `window`
fn intake_by_date(records: &[NutritionRecord], window: &DateRange) -> BTreeMap<NaiveDate, DayIntake> {
    let mut days: BTreeMap<NaiveDate, DayIntake> = BTreeMap::new();
    for record in records.iter().filter(|r| window.contains(r.date())) {
        let day = days.entry(record.date()).or_default();
        day.totals = day.totals + *record.totals();
        day.meals += 1;
    }
    days
}

fn report(date: NaiveDate, intake: Option<&DayIntake>, goals: &GoalSet) -> ProgressReport {
    let (actual, meal_count) = intake
        .map(|d| (d.totals, d.meals))
        .unwrap_or((NutritionTotals::zero(), 0));
    let ratios = Ratios::of(&actual, goals);

    ProgressReport {
        date,
        actual,
        goals: *goals,
        ratios,
        insights: insights_for(&ratios),
        meal_count,
    }
}

/// Progress for a single date. Records on other dates are ignored.
pub fn evaluate_day(records: &[NutritionRecord], goals: &GoalSet, date: NaiveDate) -> ProgressReport {
    let window = DateRange::single(date);
    let days = intake_by_date(records, &window);
    report(date, days.get(&date), goals)
}

/// Progress over every date in `window`.
///
/// Dates without meals count as zero intake, so the averages (and the
/// insights derived from them) reflect the whole window.
pub fn evaluate(records: &[NutritionRecord], goals: &GoalSet, window: DateRange) -> ProgressSummary {
    let intake = intake_by_date(records, &window);

    let days: Vec<ProgressReport> = window
        .dates()
        .map(|date| report(date, intake.get(&date), goals))
        .collect();

    let day_count = days.len().max(1) as f64;
    let total: NutritionTotals = days.iter().map(|d| d.actual).sum();
    let average_actual = total.scale(1.0 / day_count);
    let average_ratios = Ratios::of(&average_actual, goals);
    // A window with no meals logged gets no advice
    let insights = if days.iter().any(|d| d.meal_count > 0) {
        insights_for(&average_ratios)
    } else {
        Vec::new()
    };

    tracing::debug!(
        start = %window.start(),
        end = %window.end(),
        calorie_ratio = average_ratios.calories,
        protein_ratio = average_ratios.protein,
        insights = insights.len(),
        "Evaluated progress window"
    );

    ProgressSummary {
        window,
        goals: *goals,
        days,
        average_actual,
        average_ratios,
        insights,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealType;
    use crate::nutrition::{aggregate, ParsedNutrition};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    fn record(day: u32, meal_type: MealType, calories: f64, protein: f64) -> NutritionRecord {
        let parsed = ParsedNutrition::from_stated_totals(NutritionTotals {
            calories,
            protein_g: protein,
            carbs_g: 50.0,
            fat_g: 20.0,
            ..NutritionTotals::zero()
        });
        aggregate(parsed, meal_type, date(day)).unwrap()
    }

    #[test]
    fn test_low_calorie_week() {
        let goals = GoalSet::default();
        let calories = [1000.0, 1500.0, 1200.0, 1400.0, 1300.0, 1300.0, 1400.0];
        let records: Vec<_> = calories
            .iter()
            .enumerate()
            .map(|(i, c)| record(i as u32 + 1, MealType::Dinner, *c, 150.0))
            .collect();

        let summary = evaluate(&records, &goals, DateRange::ending_on(date(7), 7).unwrap());
        assert_eq!(summary.days.len(), 7);
        assert!((summary.average_ratios.calories - 0.65).abs() < 1e-9);
        assert_eq!(summary.insights, vec![Insight::IncreaseCalories]);
    }

    #[test]
    fn test_high_calories_and_low_protein() {
        let goals = GoalSet::new(2000, 150, 250, 65);
        let records = vec![
            record(1, MealType::Lunch, 1500.0, 40.0),
            record(1, MealType::Dinner, 1200.0, 40.0),
        ];
        let summary = evaluate(&records, &goals, DateRange::single(date(1)));
        assert_eq!(
            summary.insights,
            vec![Insight::ReducePortions, Insight::IncreaseProtein]
        );
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let goals = GoalSet::new(2000, 100, 250, 65);

        let at_low = evaluate_day(&[record(3, MealType::Lunch, 1600.0, 80.0)], &goals, date(3));
        assert!(at_low.insights.is_empty());

        let at_high = evaluate_day(&[record(3, MealType::Lunch, 2400.0, 80.0)], &goals, date(3));
        assert!(at_high.insights.is_empty());
    }

    #[test]
    fn test_zero_goal_has_zero_ratio() {
        let goals = GoalSet::new(0, 150, 250, 65);
        let report = evaluate_day(&[record(2, MealType::Snack, 800.0, 150.0)], &goals, date(2));
        assert_eq!(report.ratios.calories, 0.0);
        assert!((report.ratios.protein - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_day_sums_all_meals_and_ignores_other_dates() {
        let goals = GoalSet::default();
        let records = vec![
            record(5, MealType::Breakfast, 400.0, 25.0),
            record(5, MealType::Lunch, 700.0, 45.0),
            record(6, MealType::Lunch, 900.0, 60.0),
        ];
        let report = evaluate_day(&records, &goals, date(5));
        assert_eq!(report.meal_count, 2);
        assert_eq!(report.actual.calories, 1100.0);
        assert_eq!(report.actual.protein_g, 70.0);
        assert!((report.ratios.calories - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_empty_days_count_toward_average() {
        let goals = GoalSet::default();
        let records = vec![record(7, MealType::Dinner, 2000.0, 150.0)];
        let summary = evaluate(&records, &goals, DateRange::ending_on(date(7), 2).unwrap());
        assert_eq!(summary.days[0].meal_count, 0);
        assert!((summary.average_actual.calories - 1000.0).abs() < 1e-9);
        assert!(summary.insights.contains(&Insight::IncreaseCalories));
        assert!(!summary.has_no_data());
    }

    #[test]
    fn test_window_without_records() {
        let summary = evaluate(&[], &GoalSet::default(), DateRange::ending_on(date(10), 3).unwrap());
        assert!(summary.has_no_data());
        assert!(summary.average_actual.is_zero());
        assert!(summary.insights.is_empty());
        assert_eq!(summary.days[0].insights.len(), 2);
    }
}
