use chrono::{Datelike, Duration};
use market_core::stats;
use market_core::PriceObservation;

pub const FEATURE_COUNT: usize = 9;

/// Rolling statistics look back over at most this many prior prices.
pub const ROLLING_WINDOW: usize = 7;

/// Feature rows start here: lag-2 needs two prior prices.
pub const WARMUP_ROWS: usize = 2;

/// Engineered rows aligned with their targets. Row i describes the record at
/// chronological index `i + WARMUP_ROWS` and its target is that record's
/// modal price.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

fn feature_row(prices: &[f64], t: usize, date: chrono::NaiveDate) -> Vec<f64> {
    let lag1 = prices[t - 1];
    let lag2 = prices[t - 2];
    let lag3 = if t >= 3 { prices[t - 3] } else { lag2 };
    let window = &prices[t.saturating_sub(ROLLING_WINDOW)..t];
    vec![
        lag1,
        lag2,
        lag3,
        stats::mean(window),
        stats::std_dev(window),
        t as f64,
        date.ordinal() as f64,
        date.month() as f64,
        date.weekday().num_days_from_monday() as f64,
    ]
}

/// Build the causal feature matrix from records sorted by arrival date.
///
/// Row t reads only prices strictly before t plus the calendar date at t,
/// so a record never leaks into its own features (or any earlier row's).
pub fn build(sorted: &[&PriceObservation]) -> FeatureMatrix {
    let prices: Vec<f64> = sorted.iter().map(|r| r.modal_price).collect();
    let mut rows = Vec::new();
    let mut targets = Vec::new();
    for t in WARMUP_ROWS..sorted.len() {
        rows.push(feature_row(&prices, t, sorted[t].arrival_date));
        targets.push(prices[t]);
    }
    FeatureMatrix { rows, targets }
}

/// Features for the next unseen time step: lags come from the tail of the
/// series and the calendar features from the day after the last observation.
pub fn next_step(sorted: &[&PriceObservation]) -> Vec<f64> {
    let prices: Vec<f64> = sorted.iter().map(|r| r.modal_price).collect();
    let next_date = sorted
        .last()
        .map(|r| r.arrival_date + Duration::days(1))
        .unwrap_or_default();
    feature_row(&prices, prices.len(), next_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(day: u32, price: f64) -> PriceObservation {
        PriceObservation {
            state: "Punjab".to_string(),
            district: "D".to_string(),
            market: "M".to_string(),
            commodity: "Rice".to_string(),
            variety: "Other".to_string(),
            arrival_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            min_price: price,
            max_price: price,
            modal_price: price,
        }
    }

    #[test]
    fn test_feature_shape() {
        let records: Vec<PriceObservation> = (1..=10).map(|d| obs(d, 100.0 + d as f64)).collect();
        let refs: Vec<&PriceObservation> = records.iter().collect();
        let matrix = build(&refs);
        assert_eq!(matrix.rows.len(), 8);
        assert_eq!(matrix.targets.len(), 8);
        for row in &matrix.rows {
            assert_eq!(row.len(), FEATURE_COUNT);
        }
    }

    #[test]
    fn test_lags_read_prior_prices_only() {
        let records = vec![obs(1, 10.0), obs(2, 20.0), obs(3, 30.0), obs(4, 40.0)];
        let refs: Vec<&PriceObservation> = records.iter().collect();
        let matrix = build(&refs);
        // First feature row describes index 2 (price 30): lag1=20, lag2=10,
        // lag3 falls back to lag2.
        assert_eq!(matrix.rows[0][0], 20.0);
        assert_eq!(matrix.rows[0][1], 10.0);
        assert_eq!(matrix.rows[0][2], 10.0);
        assert_eq!(matrix.targets[0], 30.0);
        // Second row (index 3): lag3 is a real third-back price.
        assert_eq!(matrix.rows[1][2], 10.0);
        assert_eq!(matrix.rows[1][0], 30.0);
    }

    #[test]
    fn test_rolling_excludes_current_row() {
        let records = vec![obs(1, 10.0), obs(2, 20.0), obs(3, 90.0)];
        let refs: Vec<&PriceObservation> = records.iter().collect();
        let matrix = build(&refs);
        // Rolling mean at index 2 covers prices[0..2] only, never the 90.
        assert_eq!(matrix.rows[0][3], 15.0);
    }

    #[test]
    fn test_causality_later_rows_do_not_change_earlier_features() {
        let records: Vec<PriceObservation> = (1..=8).map(|d| obs(d, 100.0 + d as f64)).collect();
        let refs: Vec<&PriceObservation> = records.iter().collect();
        let before = build(&refs);

        let mut perturbed = records.clone();
        perturbed[7].modal_price = 9999.0;
        let refs: Vec<&PriceObservation> = perturbed.iter().collect();
        let after = build(&refs);

        // Every feature row except the perturbed record's own is unchanged.
        for i in 0..before.rows.len() - 1 {
            assert_eq!(before.rows[i], after.rows[i]);
            assert_eq!(before.targets[i], after.targets[i]);
        }
    }

    #[test]
    fn test_next_step_uses_tail_and_next_day() {
        let records = vec![obs(1, 10.0), obs(2, 20.0), obs(3, 30.0)];
        let refs: Vec<&PriceObservation> = records.iter().collect();
        let row = next_step(&refs);
        assert_eq!(row[0], 30.0);
        assert_eq!(row[1], 20.0);
        assert_eq!(row[2], 10.0);
        assert_eq!(row[5], 3.0);
        // Jan 4th is day-of-year 4.
        assert_eq!(row[6], 4.0);
    }
}
