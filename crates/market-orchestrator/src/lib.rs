//! Engine facade over the analysis crates.
//!
//! `MarketIntelligenceEngine` owns the current dataset snapshot behind a
//! `RwLock` and routes every operation through it. Results that are pure
//! functions of `(dataset version, parameters)` are memoized in `DashMap`
//! caches; reloading the dataset bumps the version and purges them.
//! Model training is CPU-bound, so predictions run on the blocking pool
//! under a configurable timeout, with single-flight locking so concurrent
//! callers for the same commodity share one training run.

use crop_recommendation::{analyze_profitability, CropScorer};
use dashmap::DashMap;
use demand_forecast::DemandForecaster;
use market_aggregation::MarketAggregator;
use market_core::{
    CommodityAggregate, DatasetSummary, DemandForecast, MarketError, PredictionResult,
    PriceComparison, PriceDataset, PriceObservation, ProfitabilityScenarios,
    RecommendationResult, StateAggregate, YieldEstimate,
};
use price_prediction::{PredictorConfig, PricePredictor};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};


pub use yield_estimation::{YieldEstimator, YieldRequest};

/// Engine-level tunables, overridable from the environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard ceiling on one model-training run.
    pub training_timeout: Duration,
    /// Minimum price records before prediction is attempted.
    pub min_prediction_records: usize,
    /// Recommendation list length when the caller does not specify one.
    pub top_n_default: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            training_timeout: Duration::from_secs(30),
            min_prediction_records: 10,
            top_n_default: 5,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.parse().ok()
}

impl EngineConfig {
    /// Defaults overlaid with `CROPSIGHT_*` environment variables.
    /// Unset or unparseable variables keep the default.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Some(secs) = env_parse::<u64>("CROPSIGHT_TRAINING_TIMEOUT_SECS") {
            config.training_timeout = Duration::from_secs(secs);
        }
        if let Some(records) = env_parse("CROPSIGHT_MIN_PREDICTION_RECORDS") {
            config.min_prediction_records = records;
        }
        if let Some(top_n) = env_parse("CROPSIGHT_TOP_N_DEFAULT") {
            config.top_n_default = top_n;
        }
        config
    }
}

/// Cache identity for one prediction: dataset version plus the parameters
/// the result is a pure function of.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PredictionKey {
    version: u64,
    commodity: String,
    state: Option<String>,
}

/// One entry of a batch prediction: the commodity it belongs to plus its
/// individual result. A failing commodity never aborts the batch.
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub commodity: String,
    pub outcome: Result<PredictionResult, MarketError>,
}

pub struct MarketIntelligenceEngine {
    config: EngineConfig,
    dataset: RwLock<PriceDataset>,
    aggregator: MarketAggregator,
    scorer: CropScorer,
    estimator: YieldEstimator,
    forecaster: DemandForecaster,
    /// Per-version commodity aggregates (version-keyed, purged on reload).
    aggregate_cache: DashMap<u64, Arc<Vec<CommodityAggregate>>>,
    prediction_cache: DashMap<PredictionKey, PredictionResult>,
    /// Single-flight locks: held across a training run so concurrent
    /// callers for the same key await it instead of training twice.
    in_flight: DashMap<PredictionKey, Arc<Mutex<()>>>,
}

impl MarketIntelligenceEngine {
    pub fn new(rows: Vec<PriceObservation>, config: EngineConfig) -> Self {
        let dataset = PriceDataset::new(rows);
        tracing::info!(
            records = dataset.len(),
            version = dataset.version(),
            "engine initialized"
        );
        Self {
            config,
            dataset: RwLock::new(dataset),
            aggregator: MarketAggregator::new(),
            scorer: CropScorer::new(),
            estimator: YieldEstimator::new(),
            forecaster: DemandForecaster::new(),
            aggregate_cache: DashMap::new(),
            prediction_cache: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    pub fn with_defaults(rows: Vec<PriceObservation>) -> Self {
        Self::new(rows, EngineConfig::default())
    }

    async fn snapshot(&self) -> PriceDataset {
        self.dataset.read().await.clone()
    }

    /// Swap in a fresh dataset and drop every cached result. The swap
    /// happens first so no reader ever pairs old data with new caches.
    pub async fn reload(&self, rows: Vec<PriceObservation>) -> u64 {
        let next = PriceDataset::new(rows);
        let version = next.version();
        let records = next.len();
        {
            let mut guard = self.dataset.write().await;
            *guard = next;
        }
        self.aggregate_cache.clear();
        self.prediction_cache.clear();
        self.in_flight.clear();
        tracing::info!(records, version, "dataset reloaded");
        version
    }

    pub async fn dataset_version(&self) -> u64 {
        self.dataset.read().await.version()
    }

    /// Per-commodity aggregates sorted by commodity name, memoized per
    /// dataset version.
    pub async fn aggregate_by_commodity(&self) -> Arc<Vec<CommodityAggregate>> {
        let dataset = self.snapshot().await;
        if let Some(hit) = self.aggregate_cache.get(&dataset.version()) {
            return hit.value().clone();
        }
        let aggregates: Vec<CommodityAggregate> = self
            .aggregator
            .aggregate_by_commodity(&dataset)
            .into_values()
            .collect();
        let shared = Arc::new(aggregates);
        self.aggregate_cache
            .insert(dataset.version(), shared.clone());
        shared
    }

    pub async fn aggregate_by_state(
        &self,
        commodity: &str,
    ) -> Result<BTreeMap<String, StateAggregate>, MarketError> {
        let dataset = self.snapshot().await;
        self.aggregator.aggregate_by_state(&dataset, commodity)
    }

    pub async fn summary(&self) -> DatasetSummary {
        let dataset = self.snapshot().await;
        self.aggregator.summarize(&dataset)
    }

    /// Distinct commodity names, sorted.
    pub async fn commodities(&self) -> Vec<String> {
        let dataset = self.snapshot().await;
        let distinct: BTreeSet<&str> = dataset.rows().iter().map(|r| r.commodity.as_str()).collect();
        distinct.into_iter().map(str::to_string).collect()
    }

    /// Distinct state names, sorted.
    pub async fn states(&self) -> Vec<String> {
        let dataset = self.snapshot().await;
        let distinct: BTreeSet<&str> = dataset.rows().iter().map(|r| r.state.as_str()).collect();
        distinct.into_iter().map(str::to_string).collect()
    }

    pub async fn compare_prices(&self, commodity: &str) -> Result<PriceComparison, MarketError> {
        let dataset = self.snapshot().await;
        self.aggregator.compare_prices(&dataset, commodity)
    }

    /// Train the ensemble and predict the next-step price. Runs on the
    /// blocking pool under `training_timeout`; an elapsed timer reports
    /// `TimedOut` and never retries.
    pub async fn predict_price(
        &self,
        commodity: &str,
        state: Option<&str>,
    ) -> Result<PredictionResult, MarketError> {
        let dataset = self.snapshot().await;
        let key = PredictionKey {
            version: dataset.version(),
            commodity: commodity.to_string(),
            state: state.map(str::to_string),
        };
        if let Some(hit) = self.prediction_cache.get(&key) {
            return Ok(hit.value().clone());
        }

        let flight = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = flight.lock().await;
        // A concurrent caller may have finished while we waited.
        if let Some(hit) = self.prediction_cache.get(&key) {
            return Ok(hit.value().clone());
        }

        let scoped = self.scope_to_state(&dataset, commodity, state)?;
        let predictor = PricePredictor::with_config(PredictorConfig {
            min_records: self.config.min_prediction_records,
            ..PredictorConfig::default()
        });
        let commodity_owned = commodity.to_string();
        let seconds = self.config.training_timeout.as_secs();
        let handle =
            tokio::task::spawn_blocking(move || predictor.predict(&scoped, &commodity_owned));

        let result = match tokio::time::timeout(self.config.training_timeout, handle).await {
            Err(_) => {
                tracing::warn!(commodity, seconds, "model training timed out");
                Err(MarketError::TimedOut { seconds })
            }
            Ok(Err(join_err)) => std::panic::resume_unwind(join_err.into_panic()),
            Ok(Ok(prediction)) => prediction,
        };

        if let Ok(prediction) = &result {
            self.prediction_cache.insert(key, prediction.clone());
        }
        // The lock entry stays registered until the next reload so that a
        // failed run's waiters and fresh callers keep serializing through
        // the same mutex instead of racing a replacement entry.
        drop(guard);
        result
    }

    /// Predict several commodities against the same dataset snapshot.
    /// Each entry carries its own result; failures never abort the batch.
    pub async fn predict_prices(
        &self,
        commodities: &[String],
        state: Option<&str>,
    ) -> Vec<PredictionOutcome> {
        let mut outcomes = Vec::with_capacity(commodities.len());
        for commodity in commodities {
            let outcome = self.predict_price(commodity, state).await;
            if let Err(error) = &outcome {
                tracing::warn!(commodity, %error, "batch prediction entry failed");
            }
            outcomes.push(PredictionOutcome {
                commodity: commodity.clone(),
                outcome,
            });
        }
        outcomes
    }

    pub async fn recommend_crops(
        &self,
        state: Option<&str>,
        top_n: Option<usize>,
    ) -> Result<Vec<RecommendationResult>, MarketError> {
        let dataset = self.snapshot().await;
        let top_n = top_n.unwrap_or(self.config.top_n_default);
        self.scorer.recommend(&dataset, state, top_n)
    }

    pub async fn estimate_yield(
        &self,
        request: &YieldRequest,
    ) -> Result<YieldEstimate, MarketError> {
        let dataset = self.snapshot().await;
        self.estimator.estimate(request, &dataset)
    }

    pub async fn forecast_demand(
        &self,
        commodity: &str,
        state: Option<&str>,
    ) -> Result<DemandForecast, MarketError> {
        let dataset = self.snapshot().await;
        self.forecaster.forecast(&dataset, commodity, state)
    }

    pub async fn analyze_profitability(
        &self,
        commodity: &str,
        state: Option<&str>,
        total_cost: f64,
        expected_yield: f64,
    ) -> Result<ProfitabilityScenarios, MarketError> {
        let dataset = self.snapshot().await;
        analyze_profitability(&dataset, commodity, state, total_cost, expected_yield)
    }

    /// Restrict the dataset to one state's quotes for prediction. The
    /// commodity must exist somewhere; the state must quote at least one
    /// row of it.
    fn scope_to_state(
        &self,
        dataset: &PriceDataset,
        commodity: &str,
        state: Option<&str>,
    ) -> Result<PriceDataset, MarketError> {
        let name = match state {
            Some(name) => name,
            None => return Ok(dataset.clone()),
        };
        if !dataset.has_commodity(commodity) {
            return Err(MarketError::UnknownCommodity(commodity.to_string()));
        }
        let rows: Vec<PriceObservation> = dataset
            .rows()
            .iter()
            .filter(|r| r.state == name)
            .cloned()
            .collect();
        let scoped = PriceDataset::new(rows);
        if !scoped.has_commodity(commodity) {
            return Err(MarketError::NoDataForRegion(name.to_string()));
        }
        Ok(scoped)
    }

    #[cfg(test)]
    fn cached_predictions(&self) -> usize {
        self.prediction_cache.len()
    }

    #[cfg(test)]
    fn flight_locks(&self) -> usize {
        self.in_flight.len()
    }
}
