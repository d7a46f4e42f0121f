//! Meal analysis service
//!
//! Application-layer flow around the pure pipeline: call the vision model,
//! parse, aggregate, save, and evaluate progress. Every call takes the
//! acting user explicitly.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{ParseWarning, Result};
use crate::models::{
    DateRange, GoalPreset, GoalSet, MealType, NutritionRecord, ProgressReport, ProgressSummary,
};
use crate::nutrition::{aggregate, evaluate, evaluate_day, parse, ExtractionTier};
use crate::upstream::{GoalStore, MealId, MealStore, UserId, VisionClient};

/// An image submitted for analysis
#[derive(Debug, Clone)]
pub struct ImageSubmission<'a> {
    pub image: &'a [u8],
    pub mime_type: &'a str,
    pub user_note: Option<&'a str>,
    pub meal_type: MealType,
    pub date: NaiveDate,
}

/// Result of analysing one meal
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    /// `None` when nothing was detected and the meal was not saved
    pub meal_id: Option<MealId>,
    pub record: NutritionRecord,
    pub tier: ExtractionTier,
    pub warnings: Vec<ParseWarning>,
    pub nothing_detected: bool,
}

pub struct MealAnalyzer<S> {
    store: Arc<S>,
}

impl<S> Clone for MealAnalyzer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: MealStore + GoalStore> MealAnalyzer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Send an image to the vision model and record the result
    pub async fn analyze_image(
        &self,
        vision: &dyn VisionClient,
        user: UserId,
        submission: ImageSubmission<'_>,
    ) -> Result<AnalysisOutcome> {
        tracing::info!(
            user = %user,
            model = vision.model_name(),
            meal_type = %submission.meal_type,
            bytes = submission.image.len(),
            "Analyzing meal image"
        );

        let response = vision
            .analyze(submission.image, submission.mime_type, submission.user_note)
            .await
            .map_err(|e| {
                tracing::warn!(user = %user, error = %e, "Vision model request failed");
                e
            })?;

        self.record_response(user, &response, submission.meal_type, submission.date)
    }

    /// Parse a model response, validate it, and save it for `user`.
    ///
    /// Records failing validation are rejected whole and logged. A response
    /// in which nothing was detected is returned but not saved.
    pub fn record_response(
        &self,
        user: UserId,
        response_text: &str,
        meal_type: MealType,
        date: NaiveDate,
    ) -> Result<AnalysisOutcome> {
        let parsed = parse(response_text);
        let tier = parsed.tier;
        let warnings = parsed.warnings.clone();

        let record = aggregate(parsed, meal_type, date).map_err(|e| {
            tracing::warn!(user = %user, field = e.field(), error = %e, "Rejected meal record");
            e
        })?;

        if record.is_empty() {
            tracing::info!(user = %user, "Analysis yielded nothing; meal not saved");
            return Ok(AnalysisOutcome {
                meal_id: None,
                record,
                tier,
                warnings,
                nothing_detected: true,
            });
        }

        let meal_id = self.store.save_meal(user, record.clone())?;
        tracing::info!(
            user = %user,
            meal_id = meal_id.0,
            calories = record.totals().calories,
            tier = ?tier,
            "Meal recorded"
        );

        Ok(AnalysisOutcome {
            meal_id: Some(meal_id),
            record,
            tier,
            warnings,
            nothing_detected: false,
        })
    }

    /// Records for `user` within `window`
    pub fn records(&self, user: UserId, window: &DateRange) -> Result<Vec<NutritionRecord>> {
        let meals = self.store.meals_between(user, window)?;
        Ok(meals.into_iter().map(|m| m.record).collect())
    }

    pub fn day_progress(&self, user: UserId, date: NaiveDate) -> Result<ProgressReport> {
        let goals = self.store.goals(user)?;
        let records = self.records(user, &DateRange::single(date))?;
        Ok(evaluate_day(&records, &goals, date))
    }

    pub fn progress(&self, user: UserId, window: DateRange) -> Result<ProgressSummary> {
        let goals = self.store.goals(user)?;
        let records = self.records(user, &window)?;
        Ok(evaluate(&records, &goals, window))
    }

    pub fn goals(&self, user: UserId) -> Result<GoalSet> {
        Ok(self.store.goals(user)?)
    }

    /// Replace the user's goals after checking them against the allowed ranges
    pub fn update_goals(&self, user: UserId, goals: GoalSet) -> Result<GoalSet> {
        goals.validate()?;
        self.store.update_goals(user, goals)?;
        Ok(goals)
    }

    pub fn apply_preset(&self, user: UserId, preset: GoalPreset) -> Result<GoalSet> {
        self.update_goals(user, preset.goals())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, GoalError, UpstreamError};
    use crate::models::Insight;
    use crate::upstream::{FakeVisionClient, MemoryStore};

    fn analyzer() -> MealAnalyzer<MemoryStore> {
        MealAnalyzer::new(Arc::new(MemoryStore::default()))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 14).unwrap()
    }

    fn submission(note: Option<&str>) -> ImageSubmission<'_> {
        ImageSubmission {
            image: b"\x89PNG",
            mime_type: "image/png",
            user_note: note,
            meal_type: MealType::Lunch,
            date: date(),
        }
    }

    #[tokio::test]
    async fn test_analyze_image_saves_record() {
        let service = analyzer();
        let vision = FakeVisionClient::with_response(
            r#"{"totalCalories": 520, "foodItems": [
                {"item": "Burrito", "calories": 480, "protein": 22, "carbs": 60, "fat": 16},
                {"item": "Salsa", "calories": 20, "protein": 1, "carbs": 4, "fat": 0}
            ]}"#,
        );

        let outcome = service
            .analyze_image(&vision, UserId(1), submission(None))
            .await
            .unwrap();

        assert!(outcome.meal_id.is_some());
        assert_eq!(outcome.tier, ExtractionTier::Structured);
        assert_eq!(outcome.record.totals().calories, 500.0);
        assert_eq!(service.store().meal_count().unwrap(), 1);
        assert_eq!(vision.call_count(), 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_surfaced() {
        let service = analyzer();
        let vision = FakeVisionClient::failing("quota check failed");

        let err = service
            .analyze_image(&vision, UserId(1), submission(Some("large portion")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(UpstreamError::Transport(_))));
        assert_eq!(service.store().meal_count().unwrap(), 0);
    }

    #[test]
    fn test_invalid_record_is_rejected_not_saved() {
        let service = analyzer();
        let err = service
            .record_response(
                UserId(1),
                r#"{"foodItems": [{"item": "Bad", "calories": 100, "fat": -5}]}"#,
                MealType::Snack,
                date(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref v) if v.field() == "items[0].fat_g"));
        assert_eq!(service.store().meal_count().unwrap(), 0);
    }

    #[test]
    fn test_nothing_detected_is_not_saved() {
        let service = analyzer();
        let outcome = service
            .record_response(UserId(1), "I can't see any food in this photo.", MealType::Snack, date())
            .unwrap();
        assert!(outcome.nothing_detected);
        assert!(outcome.meal_id.is_none());
        assert_eq!(service.store().meal_count().unwrap(), 0);
    }

    #[test]
    fn test_day_progress_uses_stored_goals() {
        let service = analyzer();
        let user = UserId(3);
        service.apply_preset(user, GoalPreset::WeightLoss).unwrap();

        service
            .record_response(user, "Total Calories: 900\nTotal Protein: 70g", MealType::Lunch, date())
            .unwrap();
        service
            .record_response(user, "Total Calories: 900\nTotal Protein: 60g", MealType::Dinner, date())
            .unwrap();

        let report = service.day_progress(user, date()).unwrap();
        assert_eq!(report.goals, GoalPreset::WeightLoss.goals());
        assert_eq!(report.meal_count, 2);
        assert!((report.ratios.calories - 1.0).abs() < 1e-9);
        assert!(report.insights.is_empty());
    }

    #[test]
    fn test_progress_window_insights() {
        let service = analyzer();
        let user = UserId(4);
        service
            .record_response(user, "Total Calories: 1000\nTotal Protein: 150g", MealType::Lunch, date())
            .unwrap();

        let summary = service.progress(user, DateRange::ending_on(date(), 1).unwrap()).unwrap();
        assert_eq!(summary.insights, vec![Insight::IncreaseCalories]);
    }

    #[test]
    fn test_update_goals_enforces_bounds() {
        let service = analyzer();
        let err = service
            .update_goals(UserId(1), GoalSet::new(2000, 10, 250, 65))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Goal(GoalError::OutOfRange { field: "protein", .. })
        ));
        assert_eq!(service.goals(UserId(1)).unwrap(), GoalSet::default());
    }
}
