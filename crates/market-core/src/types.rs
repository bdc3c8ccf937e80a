use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One market quote for a commodity on a given day.
///
/// Prices are currency units per quintal. Rows whose prices failed to parse
/// upstream arrive as zero — they are present-but-degenerate, never missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceObservation {
    pub state: String,
    pub district: String,
    pub market: String,
    pub commodity: String,
    pub variety: String,
    pub arrival_date: NaiveDate,
    pub min_price: f64,
    pub max_price: f64,
    pub modal_price: f64,
}

static DATASET_VERSION: AtomicU64 = AtomicU64::new(1);

/// Immutable, versioned view over the loaded price observations.
///
/// Cloning is cheap (the row storage is shared) and every engine operation
/// is a pure function of a dataset snapshot plus its parameters, so any
/// number of computations may read the same dataset concurrently.
#[derive(Debug, Clone)]
pub struct PriceDataset {
    rows: Arc<[PriceObservation]>,
    version: u64,
}

impl PriceDataset {
    pub fn new(rows: Vec<PriceObservation>) -> Self {
        Self {
            rows: rows.into(),
            version: DATASET_VERSION.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn rows(&self) -> &[PriceObservation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Monotonically increasing across reloads; cache keys include it.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Rows for one commodity, in insertion order (exact string match).
    pub fn commodity_rows(&self, commodity: &str) -> Vec<&PriceObservation> {
        self.rows
            .iter()
            .filter(|r| r.commodity == commodity)
            .collect()
    }

    /// Whether any row quotes the given commodity.
    pub fn has_commodity(&self, commodity: &str) -> bool {
        self.rows.iter().any(|r| r.commodity == commodity)
    }
}

/// Descriptive statistics for one commodity across the whole dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityAggregate {
    pub commodity: String,
    pub count: usize,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// 100 − coefficient of variation × 100, clamped to [0, 100].
    pub price_stability_percent: f64,
    /// Record count relative to the most-quoted commodity, as a percentage.
    pub market_availability_percent: f64,
}

/// Same statistics grouped by state for a fixed commodity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateAggregate {
    pub state: String,
    pub count: usize,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub price_stability_percent: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// 100 − mean absolute percentage error on the held-out test split.
    pub accuracy: f64,
    pub training_samples: usize,
    pub test_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub commodity: String,
    pub current_price: f64,
    pub predicted_price: f64,
    pub price_change: f64,
    pub price_change_percent: f64,
    pub confidence_interval: ConfidenceInterval,
    pub model_metrics: ModelMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub commodity: String,
    /// Composite 40/30/30 score in [0, 100].
    pub score: f64,
    pub avg_price: f64,
    pub price_stability_percent: f64,
    pub market_availability_percent: f64,
    pub profit_potential_percent: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueEstimate {
    pub avg_market_price: f64,
    pub expected_revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldEstimate {
    pub commodity: String,
    pub min_yield_quintals: f64,
    pub expected_yield_quintals: f64,
    pub max_yield_quintals: f64,
    /// Grows with available price history, capped below 100.
    pub confidence_percent: f64,
    /// Present only when market data exists for the commodity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_estimate: Option<RevenueEstimate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandForecast {
    pub commodity: String,
    pub current_demand: DemandLevel,
    pub trend: PriceTrend,
    pub forecasted_price: f64,
    pub confidence_percent: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Whole-dataset summary for the data overview endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub commodities: usize,
    pub states: usize,
    pub districts: usize,
    pub markets: usize,
    pub avg_modal_price: f64,
    pub min_modal_price: f64,
    pub max_modal_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRange {
    pub highest: f64,
    pub lowest: f64,
    pub difference: f64,
}

/// Cross-state comparison for one commodity, sorted by average price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceComparison {
    pub commodity: String,
    pub by_state: Vec<StateAggregate>,
    pub best_state: String,
    pub worst_state: String,
    pub price_range: PriceRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitabilityScenario {
    pub price_per_quintal: f64,
    pub total_revenue: f64,
    pub profit: f64,
    pub roi_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitabilityScenarios {
    pub commodity: String,
    pub best_case: ProfitabilityScenario,
    pub average_case: ProfitabilityScenario,
    pub worst_case: ProfitabilityScenario,
    pub break_even_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(commodity: &str, price: f64) -> PriceObservation {
        PriceObservation {
            state: "Punjab".to_string(),
            district: "Ludhiana".to_string(),
            market: "Ludhiana".to_string(),
            commodity: commodity.to_string(),
            variety: "Other".to_string(),
            arrival_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            min_price: price * 0.9,
            max_price: price * 1.1,
            modal_price: price,
        }
    }

    #[test]
    fn test_dataset_versions_increase() {
        let a = PriceDataset::new(vec![obs("Rice", 100.0)]);
        let b = PriceDataset::new(vec![obs("Rice", 100.0)]);
        assert!(b.version() > a.version());
    }

    #[test]
    fn test_commodity_rows_exact_match() {
        let ds = PriceDataset::new(vec![obs("Rice", 100.0), obs("rice", 200.0)]);
        // Grouping is exact string equality: no case folding.
        assert_eq!(ds.commodity_rows("Rice").len(), 1);
        assert_eq!(ds.commodity_rows("rice").len(), 1);
        assert!(!ds.has_commodity("RICE"));
    }

    #[test]
    fn test_demand_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&DemandLevel::High).unwrap(),
            "\"high\""
        );
        assert_eq!(
            serde_json::to_string(&PriceTrend::Increasing).unwrap(),
            "\"increasing\""
        );
    }
}
