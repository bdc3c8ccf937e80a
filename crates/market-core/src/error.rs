use thiserror::Error;

/// Typed failures reported by every engine operation.
///
/// The API layer must be able to tell "no data" apart from "value is
/// legitimately zero", so no operation ever substitutes a default number
/// for one of these conditions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("unknown commodity: {0}")]
    UnknownCommodity(String),

    #[error("no market data for region: {0}")]
    NoDataForRegion(String),

    #[error("insufficient data for {commodity}: {available} records, {required} required")]
    InsufficientData {
        commodity: String,
        required: usize,
        available: usize,
    },

    #[error("degenerate data for {0}: zero variance")]
    DegenerateData(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("model training timed out after {seconds}s")]
    TimedOut { seconds: u64 },
}

impl MarketError {
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        MarketError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind, suitable for a JSON error body.
    pub fn kind(&self) -> &'static str {
        match self {
            MarketError::UnknownCommodity(_) => "unknown_commodity",
            MarketError::NoDataForRegion(_) => "no_data_for_region",
            MarketError::InsufficientData { .. } => "insufficient_data",
            MarketError::DegenerateData(_) => "degenerate_data",
            MarketError::InvalidParameter { .. } => "invalid_parameter",
            MarketError::TimedOut { .. } => "timed_out",
        }
    }
}
