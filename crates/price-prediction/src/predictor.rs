use crate::features;
use crate::regressor::{BaggedTreeRegressor, GradientBoostedTrees, Regressor};
use market_core::stats;
use market_core::{
    ConfidenceInterval, MarketError, ModelMetrics, PredictionResult, PriceDataset,
    PriceObservation,
};

/// Tunable policy for the prediction pipeline. Defaults mirror the
/// production values; the orchestrator may override `min_records` from the
/// environment.
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Minimum chronologically orderable records before training is attempted.
    pub min_records: usize,
    /// Share of feature rows held out as the chronological test split.
    pub test_fraction: f64,
    /// Confidence interval half-width, in test-residual standard deviations.
    pub residual_band: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            min_records: 10,
            test_fraction: 0.2,
            residual_band: 1.5,
        }
    }
}

pub struct PricePredictor {
    config: PredictorConfig,
}

impl PricePredictor {
    pub fn new() -> Self {
        Self {
            config: PredictorConfig::default(),
        }
    }

    pub fn with_config(config: PredictorConfig) -> Self {
        Self { config }
    }

    /// Train the two-regressor ensemble on a commodity's history and
    /// predict the next time step.
    pub fn predict(
        &self,
        dataset: &PriceDataset,
        commodity: &str,
    ) -> Result<PredictionResult, MarketError> {
        let mut rows: Vec<&PriceObservation> = dataset.commodity_rows(commodity);
        if rows.is_empty() {
            return Err(MarketError::UnknownCommodity(commodity.to_string()));
        }
        if rows.len() < self.config.min_records {
            return Err(MarketError::InsufficientData {
                commodity: commodity.to_string(),
                required: self.config.min_records,
                available: rows.len(),
            });
        }

        // Stable sort: same-day quotes keep insertion order so feature
        // construction is deterministic.
        rows.sort_by_key(|r| r.arrival_date);

        let matrix = features::build(&rows);
        let m = matrix.rows.len();
        let test_len = ((m as f64 * self.config.test_fraction).ceil() as usize).max(1);
        // A permissive min_records can admit series too short to produce
        // any feature rows; saturate so they fall into the guard below.
        let train_len = m.saturating_sub(test_len);
        if train_len < 4 {
            return Err(MarketError::InsufficientData {
                commodity: commodity.to_string(),
                required: self.config.min_records.max(7),
                available: rows.len(),
            });
        }

        let (x_train, x_test) = matrix.rows.split_at(train_len);
        let (y_train, y_test) = matrix.targets.split_at(train_len);

        if stats::std_dev(y_train) == 0.0 {
            return Err(MarketError::DegenerateData(commodity.to_string()));
        }

        let mut bagged = BaggedTreeRegressor::new();
        let mut boosted = GradientBoostedTrees::new();
        bagged.fit(x_train, y_train);
        boosted.fit(x_train, y_train);

        // Held-out evaluation on the most recent slice.
        let test_pred: Vec<f64> = x_test
            .iter()
            .map(|row| (bagged.predict(row) + boosted.predict(row)) / 2.0)
            .collect();
        let residuals: Vec<f64> = y_test
            .iter()
            .zip(&test_pred)
            .map(|(actual, pred)| actual - pred)
            .collect();

        let pct_errors: Vec<f64> = y_test
            .iter()
            .zip(&test_pred)
            .filter(|(actual, _)| **actual != 0.0)
            .map(|(actual, pred)| ((actual - pred) / actual).abs() * 100.0)
            .collect();
        if pct_errors.is_empty() {
            // Every test target is a degenerate zero-price row.
            return Err(MarketError::DegenerateData(commodity.to_string()));
        }
        let accuracy = (100.0 - stats::mean(&pct_errors)).clamp(0.0, 100.0);

        let next_row = features::next_step(&rows);
        let predicted_price =
            ((bagged.predict(&next_row) + boosted.predict(&next_row)) / 2.0).max(0.0);

        let band = self.config.residual_band * stats::std_dev(&residuals);
        let confidence_interval = ConfidenceInterval {
            lower: (predicted_price - band).max(0.0),
            upper: predicted_price + band,
        };

        let current_price = rows
            .last()
            .map(|r| r.modal_price)
            .unwrap_or(0.0);
        let price_change = predicted_price - current_price;
        let price_change_percent = if current_price != 0.0 {
            price_change / current_price * 100.0
        } else {
            0.0
        };

        tracing::debug!(
            commodity,
            training_samples = train_len,
            test_samples = test_len,
            accuracy,
            predicted_price,
            "trained {} + {} ensemble",
            bagged.name(),
            boosted.name()
        );

        Ok(PredictionResult {
            commodity: commodity.to_string(),
            current_price,
            predicted_price,
            price_change,
            price_change_percent,
            confidence_interval,
            model_metrics: ModelMetrics {
                accuracy,
                training_samples: train_len,
                test_samples: test_len,
            },
        })
    }
}

impl Default for PricePredictor {
    fn default() -> Self {
        Self::new()
    }
}
