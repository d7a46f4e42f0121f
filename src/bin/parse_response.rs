//! Parse a saved meal analysis response and print the resulting record
//! Usage: cargo run --bin parse_response -- [file|-] [meal_type] [date]

use std::io::Read;

use chrono::{Local, NaiveDate};
use serde_json::json;

use nutritrack::models::MealType;
use nutritrack::nutrition::{aggregate, parse};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let source = args.get(1).map(|s| s.as_str()).unwrap_or("-");
    let meal_type: MealType = args.get(2).map(|s| s.as_str()).unwrap_or("snack").parse()?;
    let date = match args.get(3) {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")?,
        None => Local::now().date_naive(),
    };

    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source)?
    };

    let parsed = parse(&text);
    let tier = parsed.tier;
    let warnings = parsed.warnings.clone();
    eprintln!("Extraction tier: {:?}", tier);
    for warning in &warnings {
        eprintln!("  warning: {}", serde_json::to_string(warning)?);
    }

    let record = aggregate(parsed, meal_type, date)?;
    if record.is_empty() {
        eprintln!("No nutrition data found");
    }

    let output = json!({
        "tier": tier,
        "warnings": warnings,
        "macro_breakdown": record.totals().macro_breakdown(),
        "record": record,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
