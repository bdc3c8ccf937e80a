//! Descriptive statistics over the price dataset: per-commodity and
//! per-state aggregates, whole-dataset summaries and cross-state price
//! comparison.
//!
//! Grouping keys are exact string equality on the source fields. No case or
//! whitespace normalization happens here — "Rice" and "rice" are distinct
//! commodities by policy, and the loader is responsible for any cleanup.

use market_core::{
    CommodityAggregate, DatasetSummary, DateRange, MarketError, PriceComparison, PriceDataset,
    PriceRange, StateAggregate,
};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashSet};

/// Stability convention: a group with one record or a zero mean has no
/// observable variance and reports 100.
fn stability_percent(prices: &[f64]) -> f64 {
    if prices.len() < 2 {
        return 100.0;
    }
    let avg = prices.mean();
    if avg == 0.0 {
        return 100.0;
    }
    let cv = prices.std_dev() / avg;
    (100.0 - cv * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Default)]
pub struct MarketAggregator;

impl MarketAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Per-commodity aggregates over the whole dataset, keyed by commodity.
    /// The map is empty when the dataset is; callers asking about a single
    /// commodity should use the typed lookups instead.
    pub fn aggregate_by_commodity(
        &self,
        dataset: &PriceDataset,
    ) -> BTreeMap<String, CommodityAggregate> {
        let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for row in dataset.rows() {
            groups.entry(&row.commodity).or_default().push(row.modal_price);
        }

        let max_count = groups.values().map(|g| g.len()).max().unwrap_or(0);

        groups
            .into_iter()
            .map(|(commodity, prices)| {
                let aggregate = CommodityAggregate {
                    commodity: commodity.to_string(),
                    count: prices.len(),
                    avg_price: prices.as_slice().mean(),
                    min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
                    max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    price_stability_percent: stability_percent(&prices),
                    market_availability_percent: prices.len() as f64 / max_count as f64 * 100.0,
                };
                (commodity.to_string(), aggregate)
            })
            .collect()
    }

    /// Per-state aggregates for one commodity. A commodity with zero
    /// matching rows is an explicit error, never an empty map.
    pub fn aggregate_by_state(
        &self,
        dataset: &PriceDataset,
        commodity: &str,
    ) -> Result<BTreeMap<String, StateAggregate>, MarketError> {
        let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for row in dataset.rows().iter().filter(|r| r.commodity == commodity) {
            groups.entry(&row.state).or_default().push(row.modal_price);
        }

        if groups.is_empty() {
            return Err(MarketError::UnknownCommodity(commodity.to_string()));
        }

        Ok(groups
            .into_iter()
            .map(|(state, prices)| {
                let aggregate = StateAggregate {
                    state: state.to_string(),
                    count: prices.len(),
                    avg_price: prices.as_slice().mean(),
                    min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
                    max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    price_stability_percent: stability_percent(&prices),
                };
                (state.to_string(), aggregate)
            })
            .collect())
    }

    /// Whole-dataset summary for the data overview endpoint.
    pub fn summarize(&self, dataset: &PriceDataset) -> DatasetSummary {
        let rows = dataset.rows();
        let mut commodities = HashSet::new();
        let mut states = HashSet::new();
        let mut districts = HashSet::new();
        let mut markets = HashSet::new();
        for row in rows {
            commodities.insert(row.commodity.as_str());
            states.insert(row.state.as_str());
            districts.insert(row.district.as_str());
            markets.insert(row.market.as_str());
        }

        let prices: Vec<f64> = rows.iter().map(|r| r.modal_price).collect();
        let date_range = rows
            .iter()
            .map(|r| r.arrival_date)
            .min()
            .zip(rows.iter().map(|r| r.arrival_date).max())
            .map(|(start, end)| DateRange { start, end });

        DatasetSummary {
            total_records: rows.len(),
            commodities: commodities.len(),
            states: states.len(),
            districts: districts.len(),
            markets: markets.len(),
            avg_modal_price: if prices.is_empty() {
                0.0
            } else {
                prices.as_slice().mean()
            },
            min_modal_price: if prices.is_empty() {
                0.0
            } else {
                prices.iter().copied().fold(f64::INFINITY, f64::min)
            },
            max_modal_price: if prices.is_empty() {
                0.0
            } else {
                prices.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            },
            date_range,
        }
    }

    /// Cross-state comparison for one commodity, best-priced state first.
    /// Ties sort by state name so the order is reproducible.
    pub fn compare_prices(
        &self,
        dataset: &PriceDataset,
        commodity: &str,
    ) -> Result<PriceComparison, MarketError> {
        let by_state = self.aggregate_by_state(dataset, commodity)?;

        let mut ranked: Vec<StateAggregate> = by_state.into_values().collect();
        ranked.sort_by(|a, b| {
            b.avg_price
                .partial_cmp(&a.avg_price)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.state.cmp(&b.state))
        });

        let highest = ranked.first().map(|s| s.avg_price).unwrap_or(0.0);
        let lowest = ranked.last().map(|s| s.avg_price).unwrap_or(0.0);

        Ok(PriceComparison {
            commodity: commodity.to_string(),
            best_state: ranked.first().map(|s| s.state.clone()).unwrap_or_default(),
            worst_state: ranked.last().map(|s| s.state.clone()).unwrap_or_default(),
            price_range: PriceRange {
                highest,
                lowest,
                difference: highest - lowest,
            },
            by_state: ranked,
        })
    }
}
