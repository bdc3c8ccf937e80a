use market_core::{
    MarketError, PriceDataset, ProfitabilityScenario, ProfitabilityScenarios,
};

fn scenario(price: f64, expected_yield: f64, total_cost: f64) -> ProfitabilityScenario {
    let total_revenue = price * expected_yield;
    let profit = total_revenue - total_cost;
    ProfitabilityScenario {
        price_per_quintal: price,
        total_revenue,
        profit,
        roi_percent: profit / total_cost * 100.0,
    }
}

/// Best/average/worst revenue scenarios for selling `expected_yield`
/// quintals against the commodity's observed price range.
pub fn analyze_profitability(
    dataset: &PriceDataset,
    commodity: &str,
    state: Option<&str>,
    total_cost: f64,
    expected_yield: f64,
) -> Result<ProfitabilityScenarios, MarketError> {
    if total_cost <= 0.0 {
        return Err(MarketError::invalid_parameter(
            "total_cost",
            "must be positive",
        ));
    }
    if expected_yield <= 0.0 {
        return Err(MarketError::invalid_parameter(
            "expected_yield",
            "must be positive",
        ));
    }

    if !dataset.has_commodity(commodity) {
        return Err(MarketError::UnknownCommodity(commodity.to_string()));
    }
    let prices: Vec<f64> = dataset
        .rows()
        .iter()
        .filter(|r| r.commodity == commodity)
        .filter(|r| state.map_or(true, |s| r.state == s))
        .map(|r| r.modal_price)
        .collect();
    if prices.is_empty() {
        // The commodity exists, the requested state just never quotes it.
        return Err(MarketError::NoDataForRegion(
            state.unwrap_or_default().to_string(),
        ));
    }

    let avg = prices.iter().sum::<f64>() / prices.len() as f64;
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);

    Ok(ProfitabilityScenarios {
        commodity: commodity.to_string(),
        best_case: scenario(max, expected_yield, total_cost),
        average_case: scenario(avg, expected_yield, total_cost),
        worst_case: scenario(min, expected_yield, total_cost),
        break_even_price: total_cost / expected_yield,
    })
}
