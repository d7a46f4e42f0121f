//! Nutrition pipeline
//!
//! Model response → parsed nutrition → validated record → progress.
//! Every stage is a pure function.

pub mod aggregator;
pub mod evaluator;
pub mod parser;

pub use aggregator::aggregate;
pub use evaluator::{
    evaluate, evaluate_day, insights_for, CALORIE_HIGH_RATIO, CALORIE_LOW_RATIO, PROTEIN_LOW_RATIO,
};
pub use parser::{parse, ExtractionTier, ParsedNutrition};
