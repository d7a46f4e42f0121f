//! Nutrition aggregation
//!
//! Resolves parsed output into one validated `NutritionRecord`.

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::models::{MealType, NutritionRecord, NutritionTotals};
use super::parser::ParsedNutrition;

/// Build a record from parsed output.
///
/// Items are ground truth when present: totals are their sum and the stated
/// totals are ignored. Without items the stated totals are used as-is.
pub fn aggregate(
    parsed: ParsedNutrition,
    meal_type: MealType,
    date: NaiveDate,
) -> Result<NutritionRecord, ValidationError> {
    for (index, item) in parsed.items.iter().enumerate() {
        item.totals().validate(&format!("items[{}].", index))?;
    }

    let totals = if parsed.items.is_empty() {
        parsed.stated_totals
    } else {
        parsed.items.iter().map(|item| item.totals()).sum::<NutritionTotals>()
    };
    totals.validate("totals.")?;

    if !parsed.items.is_empty() && parsed.stated_totals.calories > 0.0 {
        let drift = (parsed.stated_totals.calories - totals.calories).abs();
        if drift >= 1.0 {
            tracing::debug!(
                stated = parsed.stated_totals.calories,
                summed = totals.calories,
                "Stated calories differ from item sum; using item sum"
            );
        }
    }

    Ok(NutritionRecord::new(
        date,
        meal_type,
        parsed.items,
        totals,
        parsed.raw_response,
    ))
}
