//! Prompts sent to the vision model
//!
//! The markdown prompt fixes the table column order the parser relies on:
//! Item, Portion Size, Calories, Protein, Carbs, Fat, then Fiber and Sugar.

use serde::{Deserialize, Serialize};

/// Which output format to request from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Markdown table plus labeled totals
    #[default]
    Markdown,
    /// JSON object with a `foodItems` array
    Structured,
}

pub const MARKDOWN_PROMPT: &str = r#"You are an expert nutritionist and food scientist. Analyze the provided food image and identify all visible food items with their estimated portion sizes. Calculate the calories and macronutrients for each item using standard nutritional data.

Respond with a structured analysis that includes:
1. A markdown table with exactly these columns, in this order: Item | Portion Size | Calories (kcal) | Protein (g) | Carbs (g) | Fat (g) | Fiber (g) | Sugar (g)
2. A summary with one line each for Total Calories, Total Protein, Total Carbs and Total Fat
3. Brief health insights (1-2 sentences)

Use plain numbers in the numeric columns. Consider cooking methods and food preparation when estimating.

End with: _AI can make mistakes. Please verify information before making conclusions._"#;

pub const STRUCTURED_PROMPT: &str = r#"Analyze the food in this image and estimate its nutritional content.
Respond ONLY with a JSON object. The JSON must have two keys: "totalCalories" (a number) and "foodItems" (an array of objects).
Each object in "foodItems" must have these keys: "item" (string), "calories" (number), "fat" (number), "carbs" (number), "protein" (number), "sugar" (number), "fiber" (number).
Do not include any text outside the JSON object."#;

/// Full prompt for `style`, with the user's note appended when present
pub fn build_prompt(style: PromptStyle, user_note: Option<&str>) -> String {
    let base = match style {
        PromptStyle::Markdown => MARKDOWN_PROMPT,
        PromptStyle::Structured => STRUCTURED_PROMPT,
    };

    match user_note.map(str::trim).filter(|n| !n.is_empty()) {
        Some(note) => format!("{}\n\nAdditional context from user: {}", base, note),
        None => base.to_string(),
    }
}
