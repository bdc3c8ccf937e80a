//! Yield estimation from a per-crop baseline and input spend.
//!
//! The estimate is `baseline × land size × input efficiency`, where the
//! efficiency multiplier is a saturating function of fertilizer, irrigation
//! and labor spend: more spend never lowers the estimate, and returns
//! diminish toward each channel's cap.

use market_core::{MarketError, PriceDataset, RevenueEstimate, YieldEstimate};
use serde::{Deserialize, Serialize};

/// Baseline yields in quintals per acre under typical input levels.
const BASE_YIELDS: &[(&str, f64)] = &[
    ("Rice", 25.0),
    ("Wheat", 30.0),
    ("Potato", 200.0),
    ("Onion", 150.0),
    ("Tomato", 180.0),
    ("Cotton", 15.0),
    ("Sugarcane", 350.0),
    ("Maize", 28.0),
    ("Soybean", 12.0),
    ("Groundnut", 15.0),
    ("Bajra", 10.0),
    ("Jowar", 12.0),
    ("Tur", 8.0),
    ("Gram", 10.0),
    ("Mustard", 12.0),
    ("Sunflower", 10.0),
];

/// Symmetric uncertainty band around the expected yield.
const SPREAD_FRACTION: f64 = 0.15;

/// Confidence never reaches 100: this is an estimate, not a measurement.
const CONFIDENCE_CEILING: f64 = 95.0;
const CONFIDENCE_FLOOR: f64 = 30.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldRequest {
    pub commodity: String,
    pub land_size_acres: f64,
    pub fertilizer_cost: f64,
    pub irrigation_cost: f64,
    pub labor_cost: f64,
}

/// One input channel's efficiency: starts at `floor` with zero spend and
/// saturates toward `cap` as spend passes `scale` currency units.
fn channel_efficiency(spend: f64, floor: f64, cap: f64, scale: f64) -> f64 {
    floor + (cap - floor) * (1.0 - (-spend / scale).exp())
}

fn input_efficiency(fertilizer: f64, irrigation: f64, labor: f64) -> f64 {
    let f = channel_efficiency(fertilizer, 0.5, 1.5, 10_000.0);
    let i = channel_efficiency(irrigation, 0.6, 1.3, 5_000.0);
    let l = channel_efficiency(labor, 0.7, 1.2, 15_000.0);
    (f + i + l) / 3.0
}

#[derive(Debug, Default)]
pub struct YieldEstimator;

impl YieldEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn estimate(
        &self,
        request: &YieldRequest,
        dataset: &PriceDataset,
    ) -> Result<YieldEstimate, MarketError> {
        if !request.land_size_acres.is_finite() || request.land_size_acres <= 0.0 {
            return Err(MarketError::invalid_parameter(
                "land_size_acres",
                "must be positive",
            ));
        }
        for (name, value) in [
            ("fertilizer_cost", request.fertilizer_cost),
            ("irrigation_cost", request.irrigation_cost),
            ("labor_cost", request.labor_cost),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MarketError::invalid_parameter(name, "must be non-negative"));
            }
        }

        let baseline = BASE_YIELDS
            .iter()
            .find(|(c, _)| *c == request.commodity)
            .map(|(_, y)| *y)
            .ok_or_else(|| MarketError::UnknownCommodity(request.commodity.clone()))?;

        let efficiency = input_efficiency(
            request.fertilizer_cost,
            request.irrigation_cost,
            request.labor_cost,
        );
        let expected = baseline * request.land_size_acres * efficiency;
        let min = expected * (1.0 - SPREAD_FRACTION);
        let max = expected * (1.0 + SPREAD_FRACTION);

        let history: Vec<f64> = dataset
            .commodity_rows(&request.commodity)
            .iter()
            .map(|r| r.modal_price)
            .collect();
        let confidence = (CONFIDENCE_FLOOR + history.len() as f64).min(CONFIDENCE_CEILING);

        let revenue_estimate = if history.is_empty() {
            None
        } else {
            let avg_market_price = history.iter().sum::<f64>() / history.len() as f64;
            Some(RevenueEstimate {
                avg_market_price,
                expected_revenue: avg_market_price * expected,
            })
        };

        Ok(YieldEstimate {
            commodity: request.commodity.clone(),
            min_yield_quintals: min,
            expected_yield_quintals: expected,
            max_yield_quintals: max,
            confidence_percent: confidence,
            revenue_estimate,
        })
    }
}
