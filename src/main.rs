//! NutriTrack
//!
//! An MCP server for meal photo analysis and nutrition goal tracking.

use std::sync::Arc;

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use nutritrack::build_info;
use nutritrack::config::Config;
use nutritrack::db;
use nutritrack::mcp::NutritrackService;
use nutritrack::upstream::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("nutritrack={}", config.log_level).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    // Print startup banner to stderr
    build_info::print_startup_banner();
    eprintln!("Starting MCP server on stdio...");

    let db_path = config.database_path.clone();
    eprintln!("Database path: {}", db_path.display());

    // Ensure data directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    eprintln!("Initializing database...");
    let database = db::Database::new(&db_path)?;

    // Run migrations
    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    let goals = config.default_goals;
    eprintln!(
        "Default goals: {} kcal, {}g protein, {}g carbs, {}g fat",
        goals.calorie_goal, goals.protein_goal_g, goals.carb_goal_g, goals.fat_goal_g
    );
    if let Err(e) = goals.validate() {
        tracing::warn!(error = %e, "Default goals are outside the range users may set");
    }

    let store = Arc::new(SqliteStore::new(database, goals));
    let service = NutritrackService::new(store, db_path);

    // Create stdio transport
    let transport = (stdin(), stdout());

    // Start the MCP server
    let server = service.serve(transport).await?;

    // Wait for the server to complete
    server.waiting().await?;

    Ok(())
}
