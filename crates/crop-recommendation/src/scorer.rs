use market_aggregation::MarketAggregator;
use market_core::stats::clamp_percent;
use market_core::{CommodityAggregate, MarketError, PriceDataset, RecommendationResult};

/// Fixed scoring policy: relative price 40%, stability 30%, availability 30%.
/// Product policy constants, not per-request tunables.
const WEIGHT_PRICE: f64 = 0.40;
const WEIGHT_STABILITY: f64 = 0.30;
const WEIGHT_AVAILABILITY: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Factor {
    Price,
    Stability,
    Availability,
}

/// Which weighted factor contributes most to the score. Ties resolve in
/// weight order (price first) so the reason text is reproducible.
fn dominant_factor(price: f64, stability: f64, availability: f64) -> Factor {
    let c_price = WEIGHT_PRICE * price;
    let c_stab = WEIGHT_STABILITY * stability;
    let c_avail = WEIGHT_AVAILABILITY * availability;
    if c_price >= c_stab && c_price >= c_avail {
        Factor::Price
    } else if c_stab >= c_avail {
        Factor::Stability
    } else {
        Factor::Availability
    }
}

fn reason_text(score: f64, factor: Factor) -> String {
    let strength = if score >= 70.0 {
        "Excellent choice"
    } else if score >= 50.0 {
        "Good option"
    } else if score >= 30.0 {
        "Moderate choice"
    } else {
        "Risky option"
    };
    let driver = match factor {
        Factor::Price => "strong price advantage over other crops",
        Factor::Stability => "consistently stable prices",
        Factor::Availability => "wide market availability",
    };
    format!("{}: {}", strength, driver)
}

#[derive(Debug, Default)]
pub struct CropScorer {
    aggregator: MarketAggregator,
}

impl CropScorer {
    pub fn new() -> Self {
        Self {
            aggregator: MarketAggregator::new(),
        }
    }

    /// Rank commodities by the weighted composite score, optionally
    /// restricted to one state first. The returned list is sorted by score
    /// descending, ties broken by average price descending then commodity
    /// name ascending, and truncated to `top_n`.
    pub fn recommend(
        &self,
        dataset: &PriceDataset,
        state: Option<&str>,
        top_n: usize,
    ) -> Result<Vec<RecommendationResult>, MarketError> {
        if top_n < 1 {
            return Err(MarketError::invalid_parameter(
                "top_n",
                "must be at least 1",
            ));
        }

        let restricted;
        let scope: &PriceDataset = match state {
            Some(name) => {
                let rows: Vec<_> = dataset
                    .rows()
                    .iter()
                    .filter(|r| r.state == name)
                    .cloned()
                    .collect();
                if rows.is_empty() {
                    return Err(MarketError::NoDataForRegion(name.to_string()));
                }
                restricted = PriceDataset::new(rows);
                &restricted
            }
            None => dataset,
        };

        let aggregates = self.aggregator.aggregate_by_commodity(scope);
        let max_avg = aggregates
            .values()
            .map(|a| a.avg_price)
            .fold(0.0, f64::max);

        let mut results: Vec<RecommendationResult> = aggregates
            .into_values()
            .map(|agg| self.score(agg, max_avg))
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.avg_price
                        .partial_cmp(&a.avg_price)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.commodity.cmp(&b.commodity))
        });
        results.truncate(top_n);
        tracing::debug!(
            candidates = results.len(),
            state = state.unwrap_or("all"),
            "crop recommendations ranked"
        );
        Ok(results)
    }

    fn score(&self, agg: CommodityAggregate, max_avg: f64) -> RecommendationResult {
        let normalized_price = if max_avg > 0.0 {
            clamp_percent(agg.avg_price / max_avg * 100.0)
        } else {
            0.0
        };
        let score = clamp_percent(
            WEIGHT_PRICE * normalized_price
                + WEIGHT_STABILITY * agg.price_stability_percent
                + WEIGHT_AVAILABILITY * agg.market_availability_percent,
        );
        let factor = dominant_factor(
            normalized_price,
            agg.price_stability_percent,
            agg.market_availability_percent,
        );

        RecommendationResult {
            commodity: agg.commodity,
            score,
            avg_price: agg.avg_price,
            price_stability_percent: agg.price_stability_percent,
            market_availability_percent: agg.market_availability_percent,
            profit_potential_percent: normalized_price,
            reason: reason_text(score, factor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use market_core::PriceObservation;

    fn obs(state: &str, commodity: &str, price: f64, day: u32) -> PriceObservation {
        PriceObservation {
            state: state.to_string(),
            district: "D".to_string(),
            market: "M".to_string(),
            commodity: commodity.to_string(),
            variety: "Other".to_string(),
            arrival_date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
            min_price: price,
            max_price: price,
            modal_price: price,
        }
    }

    /// Two commodities: one expensive, stable and widely quoted, the other
    /// cheap, volatile and thin.
    fn contrast_dataset() -> PriceDataset {
        let mut rows = Vec::new();
        for day in 1..=8 {
            rows.push(obs("Punjab", "Saffron", 200.0 + (day % 2) as f64, day));
        }
        rows.push(obs("Punjab", "Gourd", 40.0, 1));
        rows.push(obs("Punjab", "Gourd", 160.0, 2));
        PriceDataset::new(rows)
    }

    #[test]
    fn test_dominant_commodity_ranks_first() {
        let results = CropScorer::new()
            .recommend(&contrast_dataset(), None, 10)
            .unwrap();
        assert_eq!(results[0].commodity, "Saffron");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_scores_sorted_and_bounded() {
        let results = CropScorer::new()
            .recommend(&contrast_dataset(), None, 10)
            .unwrap();
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        for r in &results {
            assert!((0.0..=100.0).contains(&r.score));
            assert!((0.0..=100.0).contains(&r.profit_potential_percent));
        }
    }

    #[test]
    fn test_truncates_to_top_n() {
        let results = CropScorer::new()
            .recommend(&contrast_dataset(), None, 1)
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_top_n_zero_rejected() {
        let err = CropScorer::new()
            .recommend(&contrast_dataset(), None, 0)
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidParameter { name: "top_n", .. }));
    }

    #[test]
    fn test_unknown_state_rejected() {
        let err = CropScorer::new()
            .recommend(&contrast_dataset(), Some("Atlantis"), 5)
            .unwrap_err();
        assert_eq!(err, MarketError::NoDataForRegion("Atlantis".to_string()));
    }

    #[test]
    fn test_state_filter_restricts_aggregation() {
        let mut rows = Vec::new();
        rows.push(obs("Punjab", "Rice", 100.0, 1));
        rows.push(obs("Kerala", "Coconut", 300.0, 1));
        let ds = PriceDataset::new(rows);

        let results = CropScorer::new().recommend(&ds, Some("Kerala"), 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].commodity, "Coconut");
        // Alone in its region, it is the price maximum.
        assert_eq!(results[0].profit_potential_percent, 100.0);
    }

    #[test]
    fn test_identical_commodities_tie_break_by_name() {
        let rows = vec![
            obs("Punjab", "Bajra", 50.0, 1),
            obs("Punjab", "Arhar", 50.0, 1),
        ];
        let results = CropScorer::new()
            .recommend(&PriceDataset::new(rows), None, 5)
            .unwrap();
        assert_eq!(results[0].commodity, "Arhar");
        assert_eq!(results[1].commodity, "Bajra");
        assert_eq!(results[0].score, results[1].score);
    }

    #[test]
    fn test_reason_reflects_dominant_factor() {
        let results = CropScorer::new()
            .recommend(&contrast_dataset(), None, 10)
            .unwrap();
        // Saffron maxes all three factors; weight order makes price dominant.
        assert!(results[0].reason.contains("price advantage"));
        assert!(results[0].reason.starts_with("Excellent choice"));
    }

    #[test]
    fn test_idempotent() {
        let scorer = CropScorer::new();
        let ds = contrast_dataset();
        let a = scorer.recommend(&ds, None, 10).unwrap();
        let b = scorer.recommend(&ds, None, 10).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.commodity, y.commodity);
            assert_eq!(x.score, y.score);
        }
    }
}
