//! NutriTrack MCP Server Implementation
//!
//! Implements the MCP server with all NutriTrack tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::GoalSet;
use crate::service::MealAnalyzer;
use crate::tools::goals;
use crate::tools::meals;
use crate::tools::status::StatusTracker;
use crate::upstream::{build_prompt, PromptStyle, SqliteStore, UserId};

/// NutriTrack MCP Service
#[derive(Clone)]
pub struct NutritrackService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    analyzer: MealAnalyzer<SqliteStore>,
    tool_router: ToolRouter<NutritrackService>,
}

impl NutritrackService {
    pub fn new(store: Arc<SqliteStore>, database_path: PathBuf) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            analyzer: MealAnalyzer::new(store),
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Parameter Structs
// ============================================================================

fn default_user_id() -> i64 { 1 }
fn default_progress_days() -> u32 { 7 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnalysisPromptParams {
    /// "markdown" (default) or "structured"
    pub style: Option<String>,
    /// Extra context from the user, e.g. "large portion"
    pub user_note: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnalyzeResponseParams {
    pub response_text: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LogMealParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    pub response_text: String,
    /// breakfast, lunch, dinner or snack
    pub meal_type: String,
    /// YYYY-MM-DD, defaults to today
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetDayParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListMealsParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetMealAnalysisParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    pub meal_id: i64,
    /// Date the meal was logged for, defaults to today
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UserParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateGoalsParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    pub calorie_goal: Option<u32>,
    pub protein_goal_g: Option<u32>,
    pub carb_goal_g: Option<u32>,
    pub fat_goal_g: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ApplyGoalPresetParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    /// weight_loss, maintenance or muscle_gain
    pub preset: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EvaluateProgressParams {
    #[serde(default = "default_user_id")]
    pub user_id: i64,
    /// Last day of the window, defaults to today
    pub end_date: Option<String>,
    /// 7, 14 or 30
    #[serde(default = "default_progress_days")]
    pub days: u32,
}

fn prompt_style(style: Option<&str>) -> Result<PromptStyle, McpError> {
    match style.map(|s| s.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("markdown") => Ok(PromptStyle::Markdown),
        Some("structured") | Some("json") => Ok(PromptStyle::Structured),
        Some(other) => Err(McpError::invalid_params(
            format!("Unknown prompt style '{}' (use markdown or structured)", other),
            None,
        )),
    }
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl NutritrackService {
    // --- Status ---

    #[tool(description = "Get the current status of the NutriTrack service including build info, stored meal count, and process information")]
    async fn nutritrack_status(&self) -> Result<CallToolResult, McpError> {
        let stored_meals = self.analyzer.store().meal_count().ok();
        let tracker = self.status_tracker.lock().await;
        to_json(&tracker.get_status(stored_meals))
    }

    #[tool(description = "Get step-by-step instructions for analyzing and logging meals. Call this when starting a new food logging session.")]
    fn meal_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::MEAL_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(MEAL_INSTRUCTIONS)]))
    }

    // --- Analysis ---

    #[tool(description = "Get the prompt to use when analyzing a meal photo. The markdown style fixes the table column order the parser expects.")]
    fn analysis_prompt(&self, Parameters(p): Parameters<AnalysisPromptParams>) -> Result<CallToolResult, McpError> {
        let style = prompt_style(p.style.as_deref())?;
        Ok(CallToolResult::success(vec![Content::text(build_prompt(style, p.user_note.as_deref()))]))
    }

    #[tool(description = "Parse a meal analysis response and preview the extracted items and totals without saving")]
    fn analyze_response(&self, Parameters(p): Parameters<AnalyzeResponseParams>) -> Result<CallToolResult, McpError> {
        to_json(&meals::parse_response(&p.response_text))
    }

    // --- Meals ---

    #[tool(description = "Parse a meal analysis response and log it as a meal. Responses with no nutrition data are reported but not saved.")]
    fn log_meal(&self, Parameters(p): Parameters<LogMealParams>) -> Result<CallToolResult, McpError> {
        let result = meals::log_meal_analysis(
            &self.analyzer,
            UserId(p.user_id),
            &p.response_text,
            &p.meal_type,
            p.date.as_deref(),
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a day's meals organized by type, with totals and progress against goals")]
    fn get_day(&self, Parameters(p): Parameters<GetDayParams>) -> Result<CallToolResult, McpError> {
        let result = meals::get_day(&self.analyzer, UserId(p.user_id), p.date.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "List meals between two dates (inclusive)")]
    fn list_meals(&self, Parameters(p): Parameters<ListMealsParams>) -> Result<CallToolResult, McpError> {
        let result = meals::list_meals(
            &self.analyzer,
            UserId(p.user_id),
            p.start_date.as_deref(),
            p.end_date.as_deref(),
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get the full stored analysis for a meal, including the original response text")]
    fn get_meal_analysis(&self, Parameters(p): Parameters<GetMealAnalysisParams>) -> Result<CallToolResult, McpError> {
        let result = meals::get_meal_analysis(&self.analyzer, UserId(p.user_id), p.meal_id, p.date.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(meal) => to_json(&meal),
            None => Ok(CallToolResult::success(vec![Content::text(format!(
                r#"{{"error": "Meal not found", "id": {}}}"#,
                p.meal_id
            ))])),
        }
    }

    // --- Goals ---

    #[tool(description = "Get the user's daily nutrition goals")]
    fn get_goals(&self, Parameters(p): Parameters<UserParams>) -> Result<CallToolResult, McpError> {
        let result = goals::get_goals(&self.analyzer, UserId(p.user_id))
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Update daily nutrition goals. Omitted fields keep their current value. Allowed ranges: calories 1000-5000, protein 50-300g, carbs 50-500g, fat 30-200g.")]
    fn update_goals(&self, Parameters(p): Parameters<UpdateGoalsParams>) -> Result<CallToolResult, McpError> {
        let user = UserId(p.user_id);
        let current = goals::get_goals(&self.analyzer, user)
            .map_err(|e| McpError::internal_error(e, None))?;
        let updated = GoalSet::new(
            p.calorie_goal.unwrap_or(current.calorie_goal),
            p.protein_goal_g.unwrap_or(current.protein_goal_g),
            p.carb_goal_g.unwrap_or(current.carb_goal_g),
            p.fat_goal_g.unwrap_or(current.fat_goal_g),
        );
        let result = goals::update_goals(&self.analyzer, user, updated)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Replace goals with a preset: weight_loss, maintenance or muscle_gain")]
    fn apply_goal_preset(&self, Parameters(p): Parameters<ApplyGoalPresetParams>) -> Result<CallToolResult, McpError> {
        let result = goals::apply_goal_preset(&self.analyzer, UserId(p.user_id), &p.preset)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Compare average intake over the last 7, 14 or 30 days against goals and suggest adjustments")]
    fn evaluate_progress(&self, Parameters(p): Parameters<EvaluateProgressParams>) -> Result<CallToolResult, McpError> {
        let result = goals::evaluate_progress(&self.analyzer, UserId(p.user_id), p.end_date.as_deref(), p.days)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for NutritrackService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nutritrack".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("NutriTrack".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "NutriTrack - Meal photo analysis and nutrition goal tracking. \
                 IMPORTANT: Call meal_instructions when starting a food logging session. \
                 Analysis: analysis_prompt, analyze_response. \
                 Meals: log_meal, get_day, list_meals, get_meal_analysis. \
                 Goals: get_goals, update_goals, apply_goal_preset, evaluate_progress. \
                 Status: nutritrack_status."
                    .into(),
            ),
        }
    }
}
