//! Demand forecasting from recent price momentum and market availability.
//!
//! The signal chain: take the most recent prices for a commodity, fit a
//! least-squares trend, classify the slope relative to the window mean,
//! then cross the trend with the commodity's market availability to land
//! on a demand level. Rising prices in a widely-quoted market read as
//! high demand; falling prices in a thin market read as low demand.

use market_aggregation::MarketAggregator;
use market_core::stats::{clamp_percent, coefficient_of_variation, linear_fit};
use market_core::{DemandForecast, DemandLevel, MarketError, PriceDataset, PriceTrend};

/// Fewer records than this and momentum is noise.
const MIN_RECORDS: usize = 5;

/// Only the tail of the series carries demand information.
const TREND_WINDOW: usize = 10;

/// Per-step slope below ±0.5% of the window mean counts as flat.
const TREND_THRESHOLD: f64 = 0.005;

/// A commodity quoted in at least half as many records as the most-quoted
/// one counts as widely available.
const HIGH_AVAILABILITY_PERCENT: f64 = 50.0;

fn classify_trend(slope: f64, window_mean: f64) -> PriceTrend {
    if window_mean <= 0.0 {
        return PriceTrend::Stable;
    }
    let relative = slope / window_mean;
    if relative > TREND_THRESHOLD {
        PriceTrend::Increasing
    } else if relative < -TREND_THRESHOLD {
        PriceTrend::Decreasing
    } else {
        PriceTrend::Stable
    }
}

fn classify_demand(trend: PriceTrend, high_availability: bool) -> DemandLevel {
    match (trend, high_availability) {
        (PriceTrend::Increasing, true) => DemandLevel::High,
        (PriceTrend::Decreasing, false) => DemandLevel::Low,
        _ => DemandLevel::Medium,
    }
}

fn recommendation_text(demand: DemandLevel, trend: PriceTrend) -> &'static str {
    match (demand, trend) {
        (DemandLevel::High, PriceTrend::Increasing) => {
            "Strong demand with rising prices. Good time to sell; consider holding stock briefly for better rates."
        }
        (DemandLevel::High, PriceTrend::Stable) => {
            "Demand is strong and prices are steady. Sell at current rates with confidence."
        }
        (DemandLevel::High, PriceTrend::Decreasing) => {
            "Demand remains strong but prices are softening. Sell sooner rather than later."
        }
        (DemandLevel::Medium, PriceTrend::Increasing) => {
            "Prices are trending up on moderate demand. Watch the market before committing large volumes."
        }
        (DemandLevel::Medium, PriceTrend::Stable) => {
            "Balanced market with stable prices. Sell as needed; no urgency either way."
        }
        (DemandLevel::Medium, PriceTrend::Decreasing) => {
            "Prices are easing on moderate demand. Consider selling current stock before further declines."
        }
        (DemandLevel::Low, PriceTrend::Increasing) => {
            "Thin market despite rising prices. Sell into strength while it lasts."
        }
        (DemandLevel::Low, PriceTrend::Stable) => {
            "Weak demand with flat prices. Explore alternative markets or storage options."
        }
        (DemandLevel::Low, PriceTrend::Decreasing) => {
            "Weak demand and falling prices. Minimize exposure; avoid holding large stock."
        }
    }
}

#[derive(Debug, Default)]
pub struct DemandForecaster {
    aggregator: MarketAggregator,
}

impl DemandForecaster {
    pub fn new() -> Self {
        Self {
            aggregator: MarketAggregator::new(),
        }
    }

    /// Forecast demand for one commodity, optionally restricted to one
    /// state's quotes for the trend window. Availability is always judged
    /// against the full dataset, since it measures national market reach.
    pub fn forecast(
        &self,
        dataset: &PriceDataset,
        commodity: &str,
        state: Option<&str>,
    ) -> Result<DemandForecast, MarketError> {
        if !dataset.has_commodity(commodity) {
            return Err(MarketError::UnknownCommodity(commodity.to_string()));
        }

        let mut rows: Vec<_> = dataset
            .commodity_rows(commodity)
            .into_iter()
            .filter(|r| state.map_or(true, |s| r.state == s))
            .collect();
        if let Some(name) = state {
            if rows.is_empty() {
                return Err(MarketError::NoDataForRegion(name.to_string()));
            }
        }
        if rows.len() < MIN_RECORDS {
            return Err(MarketError::InsufficientData {
                commodity: commodity.to_string(),
                required: MIN_RECORDS,
                available: rows.len(),
            });
        }

        rows.sort_by_key(|r| r.arrival_date);
        let window_start = rows.len().saturating_sub(TREND_WINDOW);
        let window: Vec<f64> = rows[window_start..].iter().map(|r| r.modal_price).collect();

        let (slope, intercept) = linear_fit(&window);
        let window_mean = window.iter().sum::<f64>() / window.len() as f64;
        let trend = classify_trend(slope, window_mean);

        let aggregates = self.aggregator.aggregate_by_commodity(dataset);
        let availability = aggregates
            .get(commodity)
            .map(|a| a.market_availability_percent)
            .unwrap_or(0.0);
        let demand = classify_demand(trend, availability >= HIGH_AVAILABILITY_PERCENT);

        let forecasted_price = (intercept + slope * window.len() as f64).max(0.0);
        let confidence =
            clamp_percent(100.0 - coefficient_of_variation(&window) * 100.0);

        tracing::debug!(
            commodity,
            ?trend,
            ?demand,
            slope,
            forecasted_price,
            "demand forecast computed"
        );

        Ok(DemandForecast {
            commodity: commodity.to_string(),
            current_demand: demand,
            trend,
            forecasted_price,
            confidence_percent: confidence,
            recommendation: recommendation_text(demand, trend).to_string(),
        })
    }
}
