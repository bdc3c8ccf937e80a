//! Crop recommendation scoring and profitability scenarios.

pub mod profitability;
pub mod scorer;

pub use profitability::analyze_profitability;
pub use scorer::CropScorer;
