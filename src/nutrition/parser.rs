//! Model response parser
//!
//! Extracts food items and stated totals from a vision model's reply.
//! Three extraction tiers, tried in a fixed order:
//!
//! 1. Structured JSON with a `foodItems` array (the only tier that yields items)
//! 2. Labeled total lines such as `Total Calories: 450`
//! 3. Markdown table rows, summed, used only when tier 2 found no calories
//!
//! Parsing never fails. Anything unrecognised is skipped and defaults to zero.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ParseWarning;
use crate::models::{FoodItem, NutritionTotals};

/// Integer or decimal, optionally with thousands separators ("1,250.5")
static NUMBER_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?").ok()
});

/// Same token with an optional leading minus, for JSON string values
static SIGNED_NUMBER_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"-?(?:\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)").ok()
});

/// Body of a markdown code fence; an unclosed fence runs to the end
static FENCED_BLOCK: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)(?:```|\z)").ok()
});

/// Item cell of a table summary row: "Total", "Totals", "Grand Total"
static TOTAL_LABEL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?:grand\s+)?totals?\b").ok()
});

/// Which tier produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTier {
    Structured,
    LabeledTotals,
    Table,
    /// Nothing recognisable was found
    Nothing,
}

/// Output of [`parse`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedNutrition {
    /// Only populated by the structured tier
    pub items: Vec<FoodItem>,
    /// Totals asserted by the response itself, zero where absent
    pub stated_totals: NutritionTotals,
    pub tier: ExtractionTier,
    pub warnings: Vec<ParseWarning>,
    pub raw_response: String,
}

impl ParsedNutrition {
    fn empty(raw_response: &str) -> Self {
        Self {
            items: Vec::new(),
            stated_totals: NutritionTotals::zero(),
            tier: ExtractionTier::Nothing,
            warnings: Vec::new(),
            raw_response: raw_response.to_string(),
        }
    }

    /// Parsed output carrying only stated totals
    pub fn from_stated_totals(stated_totals: NutritionTotals) -> Self {
        Self {
            stated_totals,
            tier: ExtractionTier::LabeledTotals,
            ..Self::empty("")
        }
    }

    /// Parsed output carrying itemised foods
    pub fn from_items(items: Vec<FoodItem>) -> Self {
        Self {
            items,
            tier: ExtractionTier::Structured,
            ..Self::empty("")
        }
    }
}

/// Nutrients recognised on labeled total lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nutrient {
    Calories,
    Protein,
    Carbs,
    Fat,
}

impl Nutrient {
    const LABELED: [Nutrient; 4] = [
        Nutrient::Calories,
        Nutrient::Protein,
        Nutrient::Carbs,
        Nutrient::Fat,
    ];

    /// `line` must already be lowercase. "carb" also covers "carbohydrate".
    fn mentioned_in(&self, line: &str) -> bool {
        match self {
            Nutrient::Calories => line.contains("calorie"),
            Nutrient::Protein => line.contains("protein"),
            Nutrient::Carbs => line.contains("carb"),
            Nutrient::Fat => line.contains("fat"),
        }
    }

    fn set(&self, totals: &mut NutritionTotals, value: f64) {
        match self {
            Nutrient::Calories => totals.calories = value,
            Nutrient::Protein => totals.protein_g = value,
            Nutrient::Carbs => totals.carbs_g = value,
            Nutrient::Fat => totals.fat_g = value,
        }
    }
}

/// Parse a model response into items and stated totals
pub fn parse(response_text: &str) -> ParsedNutrition {
    let mut parsed = ParsedNutrition::empty(response_text);

    if let Some(payload) = json_payload(response_text) {
        match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(object)) => {
                parse_structured(&object, &mut parsed);
                log_result(&parsed);
                return parsed;
            }
            Ok(_) => {}
            Err(e) => parsed.warnings.push(ParseWarning::MalformedJson {
                message: e.to_string(),
            }),
        }
    }

    let labeled = extract_labeled_totals(response_text);

    if labeled.calories > 0.0 {
        parsed.stated_totals = labeled;
        parsed.tier = ExtractionTier::LabeledTotals;
    } else if let Some(table) = extract_table_totals(response_text, &mut parsed.warnings) {
        // Table sums only fill what no labeled line stated
        let fill = |stated: f64, summed: f64| if stated > 0.0 { stated } else { summed };
        parsed.stated_totals = NutritionTotals {
            calories: table.calories,
            protein_g: fill(labeled.protein_g, table.protein_g),
            carbs_g: fill(labeled.carbs_g, table.carbs_g),
            fat_g: fill(labeled.fat_g, table.fat_g),
            ..labeled
        };
        parsed.tier = ExtractionTier::Table;
    } else {
        parsed.stated_totals = labeled;
        if !labeled.is_zero() {
            parsed.tier = ExtractionTier::LabeledTotals;
        }
    }

    log_result(&parsed);
    parsed
}

fn log_result(parsed: &ParsedNutrition) {
    tracing::debug!(
        tier = ?parsed.tier,
        items = parsed.items.len(),
        calories = parsed.stated_totals.calories,
        warnings = parsed.warnings.len(),
        "Parsed model response"
    );
    for warning in &parsed.warnings {
        tracing::debug!(?warning, "Skipped part of model response");
    }
}

/// First numeric token in `text`, thousands separators removed
fn first_number(text: &str) -> Option<f64> {
    first_token(&NUMBER_PATTERN, text)
}

fn first_token(pattern: &LazyLock<Option<Regex>>, text: &str) -> Option<f64> {
    let token = pattern.as_ref()?.find(text)?;
    token.as_str().replace(',', "").parse().ok()
}

// ============================================================================
// Tier 1: structured JSON
// ============================================================================

/// The JSON object in a response: the first fenced block holding an
/// object, else a reply that starts with `{`, cut at its last `}`.
/// Prose around either form is ignored.
fn json_payload(text: &str) -> Option<&str> {
    if let Some(fence) = FENCED_BLOCK.as_ref() {
        let fenced = fence
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|body| body.as_str().trim())
            .find(|body| body.starts_with('{'));
        if fenced.is_some() {
            return fenced;
        }
    }

    let body = text.trim();
    if !body.starts_with('{') {
        return None;
    }
    let end = body.rfind('}').map_or(body.len(), |i| i + 1);
    Some(&body[..end])
}

fn parse_structured(object: &Map<String, Value>, parsed: &mut ParsedNutrition) {
    parsed.tier = ExtractionTier::Structured;

    let stated = &mut parsed.stated_totals;
    stated.calories = number_field(object, &["totalCalories", "total_calories"]).unwrap_or(0.0);
    stated.protein_g = number_field(object, &["totalProtein", "total_protein"]).unwrap_or(0.0);
    stated.carbs_g = number_field(object, &["totalCarbs", "total_carbs"]).unwrap_or(0.0);
    stated.fat_g = number_field(object, &["totalFat", "total_fat"]).unwrap_or(0.0);
    stated.sugar_g = number_field(object, &["totalSugar", "total_sugar"]).unwrap_or(0.0);
    stated.fiber_g = number_field(object, &["totalFiber", "total_fiber"]).unwrap_or(0.0);

    let Some(Value::Array(entries)) = object.get("foodItems").or_else(|| object.get("food_items"))
    else {
        return;
    };

    for (index, entry) in entries.iter().enumerate() {
        let Value::Object(fields) = entry else {
            parsed.warnings.push(ParseWarning::MalformedItemField {
                index,
                field: "item".to_string(),
            });
            continue;
        };
        parsed.items.push(structured_item(index, fields, &mut parsed.warnings));
    }
}

fn structured_item(
    index: usize,
    fields: &Map<String, Value>,
    warnings: &mut Vec<ParseWarning>,
) -> FoodItem {
    let name = ["item", "name"]
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("Item {}", index + 1));

    let mut value = |keys: &[&str]| -> f64 {
        for key in keys {
            let Some(raw) = fields.get(*key) else {
                continue;
            };
            return match numeric_value(raw) {
                Some(v) => v,
                None => {
                    warnings.push(ParseWarning::MalformedItemField {
                        index,
                        field: (*key).to_string(),
                    });
                    0.0
                }
            };
        }
        0.0
    };

    FoodItem {
        calories: value(&["calories", "kcal"]),
        protein_g: value(&["protein", "protein_g"]),
        carbs_g: value(&["carbs", "carbohydrates", "carbs_g"]),
        fat_g: value(&["fat", "fat_g"]),
        sugar_g: value(&["sugar", "sugar_g"]),
        fiber_g: value(&["fiber", "fiber_g"]),
        name,
    }
}

fn number_field(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| object.get(*key).and_then(numeric_value))
}

/// A JSON number, or a string such as "12g" holding one. Null is zero.
/// The sign is kept so negative values reach validation.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => first_token(&SIGNED_NUMBER_PATTERN, s),
        Value::Null => Some(0.0),
        _ => None,
    }
}

// ============================================================================
// Tier 2: labeled total lines
// ============================================================================

/// Totals from lines naming a nutrient and the word "total". Last line wins.
fn extract_labeled_totals(text: &str) -> NutritionTotals {
    let mut totals = NutritionTotals::zero();

    for line in text.lines() {
        let lower = line.to_lowercase();
        if !lower.contains("total") {
            continue;
        }
        let Some(value) = first_number(line) else {
            continue;
        };
        for nutrient in Nutrient::LABELED {
            if nutrient.mentioned_in(&lower) {
                nutrient.set(&mut totals, value);
            }
        }
    }

    totals
}

// ============================================================================
// Tier 3: markdown table
// ============================================================================

/// Cells that follow the item name and portion: calories, protein, carbs, fat.
/// This column order is the one requested by `upstream::prompts`.
const TABLE_NUMERIC_START: usize = 2;
const TABLE_NUMERIC_COLUMNS: usize = 4;

/// Column sums over every data row, or `None` if no row matched
fn extract_table_totals(text: &str, warnings: &mut Vec<ParseWarning>) -> Option<NutritionTotals> {
    let mut totals = NutritionTotals::zero();
    let mut rows = 0usize;

    for (index, line) in text.lines().enumerate() {
        let Some(cells) = table_cells(line) else {
            continue;
        };
        if cells.len() < TABLE_NUMERIC_START + TABLE_NUMERIC_COLUMNS {
            continue;
        }

        let item = cells[0].trim_matches('*').trim().to_lowercase();
        if TOTAL_LABEL.as_ref().is_some_and(|label| label.is_match(&item)) {
            tracing::debug!(line = index + 1, "Skipping table summary row");
            continue;
        }

        let numeric = &cells[TABLE_NUMERIC_START..TABLE_NUMERIC_START + TABLE_NUMERIC_COLUMNS];
        // Header and separator rows carry no digits at all
        if !numeric.iter().any(|c| c.chars().any(|ch| ch.is_ascii_digit())) {
            continue;
        }

        let values: Option<Vec<f64>> = numeric.iter().map(|c| first_number(c)).collect();
        let Some(values) = values else {
            warnings.push(ParseWarning::MalformedTableRow { line: index + 1 });
            continue;
        };

        totals.calories += values[0];
        totals.protein_g += values[1];
        totals.carbs_g += values[2];
        totals.fat_g += values[3];
        rows += 1;
    }

    (rows > 0).then_some(totals)
}

/// Split a markdown table row into trimmed cells
fn table_cells(line: &str) -> Option<Vec<&str>> {
    let row = line.trim().strip_prefix('|')?;
    let row = row.strip_suffix('|').unwrap_or(row);
    Some(row.split('|').map(str::trim).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
| Item | Portion Size | Calories (kcal) | Protein (g) | Carbs (g) | Fat (g) | Fiber (g) | Sugar (g) |
|------|--------------|-----------------|-------------|-----------|---------|-----------|-----------|
| Grilled chicken | 150g | 250 | 46 | 0 | 5.5 | 0 | 0 |
| Brown rice | 1 cup | 215 | 5 | 45 | 1.8 | 3.5 | 0.7 |
| Broccoli | 1 cup | 55 | 3.7 | 11.2 | 0.6 | 5.1 | 2.2 |";

    #[test]
    fn test_labeled_totals_scenario() {
        let parsed = parse("Total Calories: 450\nTotal Protein: 30g\nTotal Carbs: 40g\nTotal Fat: 10g");
        assert_eq!(parsed.tier, ExtractionTier::LabeledTotals);
        assert!(parsed.items.is_empty());
        assert_eq!(
            parsed.stated_totals,
            NutritionTotals {
                calories: 450.0,
                protein_g: 30.0,
                carbs_g: 40.0,
                fat_g: 10.0,
                sugar_g: 0.0,
                fiber_g: 0.0,
            }
        );
    }

    #[test]
    fn test_no_keywords_yields_zero() {
        let parsed = parse("This looks like a lovely salad! Enjoy your meal.");
        assert_eq!(parsed.tier, ExtractionTier::Nothing);
        assert!(parsed.items.is_empty());
        assert!(parsed.stated_totals.is_zero());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_empty_string() {
        let parsed = parse("");
        assert!(parsed.items.is_empty());
        assert!(parsed.stated_totals.is_zero());
        assert_eq!(parsed.raw_response, "");
    }

    #[test]
    fn test_last_line_wins() {
        let parsed = parse("Total calories (estimate): 300\n\n**Grand total calories: 520 kcal**");
        assert_eq!(parsed.stated_totals.calories, 520.0);
    }

    #[test]
    fn test_case_insensitive_and_carbohydrate() {
        let parsed = parse("TOTAL CALORIES - 610.5\ntotal carbohydrates: 72.25 g");
        assert_eq!(parsed.stated_totals.calories, 610.5);
        assert_eq!(parsed.stated_totals.carbs_g, 72.25);
    }

    #[test]
    fn test_first_token_on_line() {
        let parsed = parse("Total Protein: 30g (about 25% of 120g goal)");
        assert_eq!(parsed.stated_totals.protein_g, 30.0);
    }

    #[test]
    fn test_thousands_separator() {
        let parsed = parse("Total Calories: 1,250 kcal");
        assert_eq!(parsed.stated_totals.calories, 1250.0);
    }

    #[test]
    fn test_line_without_total_is_ignored() {
        let parsed = parse("Calories: 450\nProtein: 30g");
        assert!(parsed.stated_totals.is_zero());
    }

    #[test]
    fn test_table_fallback_sums_columns() {
        let parsed = parse(TABLE);
        assert_eq!(parsed.tier, ExtractionTier::Table);
        let t = parsed.stated_totals;
        assert!((t.calories - 520.0).abs() < 1e-9);
        assert!((t.protein_g - 54.7).abs() < 1e-9);
        assert!((t.carbs_g - 56.2).abs() < 1e-9);
        assert!((t.fat_g - 7.9).abs() < 1e-9);
        assert_eq!(t.fiber_g, 0.0);
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn test_labeled_total_beats_table() {
        let text = "\
| Item | Portion | Calories | Protein | Carbs | Fat |
|---|---|---|---|---|---|
| Pasta | 2 cups | 500 | 18 | 90 | 6 |
| Garlic bread | 2 slices | 300 | 8 | 36 | 14 |

Total Calories: 500";
        let parsed = parse(text);
        assert_eq!(parsed.tier, ExtractionTier::LabeledTotals);
        assert_eq!(parsed.stated_totals.calories, 500.0);
    }

    #[test]
    fn test_zero_labeled_calories_falls_back_to_table() {
        let text = format!("{}\n\nTotal Calories: 0", TABLE);
        let parsed = parse(&text);
        assert_eq!(parsed.tier, ExtractionTier::Table);
        assert!((parsed.stated_totals.calories - 520.0).abs() < 1e-9);
    }

    #[test]
    fn test_table_summary_row_not_double_counted() {
        let text = format!("{}\n| **Total** | | **520** | **54.7** | **56.2** | **7.9** | | |", TABLE);
        let parsed = parse(&text);
        assert!((parsed.stated_totals.calories - 520.0).abs() < 1e-9);
    }

    #[test]
    fn test_food_named_like_total_is_counted() {
        let text = "\
| Totally Nuts granola | 1 cup | 400 | 10 | 60 | 14 |
| Milk | 1 cup | 100 | 8 | 12 | 2.5 |
| Grand Total | | 500 | 18 | 72 | 16.5 |";
        let parsed = parse(text);
        assert_eq!(parsed.tier, ExtractionTier::Table);
        assert_eq!(parsed.stated_totals.calories, 500.0);
        assert_eq!(parsed.stated_totals.protein_g, 18.0);
    }

    #[test]
    fn test_table_keeps_labeled_macros() {
        let parsed = parse("| Toast | 1 slice | 80 | 3 | 15 | 1 |\nTotal Protein: 30g");
        assert_eq!(parsed.tier, ExtractionTier::Table);
        assert_eq!(parsed.stated_totals.calories, 80.0);
        assert_eq!(parsed.stated_totals.protein_g, 30.0);
        assert_eq!(parsed.stated_totals.carbs_g, 15.0);
    }

    #[test]
    fn test_malformed_row_keeps_accumulated_totals() {
        let text = "\
| Toast | 1 slice | 80 | 3 | 15 | 1 |
| Jam | 1 tbsp | 50 | n/a | 13 | 0 |
| Butter | 1 tsp | 35 | 0 | 0 | 4 |";
        let parsed = parse(text);
        assert_eq!(parsed.stated_totals.calories, 115.0);
        assert_eq!(parsed.stated_totals.fat_g, 5.0);
        assert_eq!(parsed.warnings, vec![ParseWarning::MalformedTableRow { line: 2 }]);
    }

    #[test]
    fn test_structured_payload() {
        let json = r#"{
            "totalCalories": 610,
            "foodItems": [
                {"item": "Salmon", "calories": 412, "fat": 27, "carbs": 0, "protein": 40},
                {"item": "Asparagus", "calories": 40, "fat": 0.4, "carbs": 7.8, "protein": 4.3, "fiber": 4.2},
                {"name": "Quinoa", "calories": "158 kcal", "fat": 2.5, "carbs": 28, "protein": 6}
            ]
        }"#;
        let parsed = parse(json);
        assert_eq!(parsed.tier, ExtractionTier::Structured);
        assert_eq!(parsed.items.len(), 3);
        assert_eq!(parsed.items[0].name, "Salmon");
        assert_eq!(parsed.items[1].fiber_g, 4.2);
        assert_eq!(parsed.items[2].name, "Quinoa");
        assert_eq!(parsed.items[2].calories, 158.0);
        assert_eq!(parsed.stated_totals.calories, 610.0);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_structured_payload_in_code_fence() {
        let text = "```json\n{\"totalCalories\": 95, \"foodItems\": [{\"item\": \"Apple\", \"calories\": 95, \"fat\": 0.3, \"carbs\": 25, \"protein\": 0.5}]}\n```";
        let parsed = parse(text);
        assert_eq!(parsed.tier, ExtractionTier::Structured);
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].carbs_g, 25.0);
    }

    #[test]
    fn test_fenced_payload_with_surrounding_prose() {
        let text = "Here is the breakdown:\n\n```json\n{\"totalCalories\": 610, \"foodItems\": [\n  {\"item\": \"Salmon\", \"calories\": 412},\n  {\"item\": \"Rice\", \"calories\": 198}\n]}\n```\nEnjoy!";
        let parsed = parse(text);
        assert_eq!(parsed.tier, ExtractionTier::Structured);
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.stated_totals.calories, 610.0);
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_bare_payload_with_trailing_prose() {
        let parsed = parse("{\"foodItems\": [{\"item\": \"Pear\", \"calories\": 100}]}\nHope this helps.");
        assert_eq!(parsed.tier, ExtractionTier::Structured);
        assert_eq!(parsed.items[0].calories, 100.0);
    }

    #[test]
    fn test_structured_bad_field_is_warning() {
        let json = r#"{"foodItems": [{"item": "Egg", "calories": [78], "protein": 6}]}"#;
        let parsed = parse(json);
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].calories, 0.0);
        assert_eq!(parsed.items[0].protein_g, 6.0);
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::MalformedItemField {
                index: 0,
                field: "calories".to_string()
            }]
        );
    }

    #[test]
    fn test_structured_keeps_sign_for_validation() {
        let parsed = parse(r#"{"foodItems": [{"item": "Glitch", "calories": -20}, {"item": "Typo", "fat": "-3.5 g"}]}"#);
        assert_eq!(parsed.items[0].calories, -20.0);
        assert_eq!(parsed.items[1].fat_g, -3.5);
    }

    #[test]
    fn test_broken_json_falls_back_to_text() {
        let parsed = parse("{\"totalCalories\": 300,\n\"foodItems\": [");
        assert!(matches!(parsed.warnings[0], ParseWarning::MalformedJson { .. }));
        assert_eq!(parsed.tier, ExtractionTier::LabeledTotals);
        assert_eq!(parsed.stated_totals.calories, 300.0);
        assert!(parsed.items.is_empty());
    }
}
