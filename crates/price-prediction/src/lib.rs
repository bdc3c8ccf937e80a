//! Next-step price prediction for a single commodity.
//!
//! The pipeline engineers strictly causal lag/rolling/temporal features
//! from the chronologically ordered price history, trains two tree-based
//! regressors with different bias/variance behavior on the older portion,
//! scores them on the most recent portion, and averages their next-step
//! predictions into an ensemble forecast with a residual-based confidence
//! interval.

pub mod features;
pub mod predictor;
pub mod regressor;
pub mod tree;

#[cfg(test)]
mod predictor_tests;

pub use predictor::{PredictorConfig, PricePredictor};
pub use regressor::{BaggedTreeRegressor, GradientBoostedTrees, Regressor};
