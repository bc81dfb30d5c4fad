use std::path::PathBuf;

use thiserror::Error;

/// Validation and contract errors exposed by `tickfuse-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error(
        "invalid domain '{value}', expected one of stocks, crypto, forex, news, economic, marketNews"
    )]
    InvalidDomain { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("date range start {from} is after end {to}")]
    InvertedDateRange { from: String, to: String },

    #[error("currency must be a 3-letter ISO code: '{value}'")]
    InvalidCurrency { value: String },
    #[error("currency pair must look like EUR/USD or EURUSD: '{value}'")]
    InvalidCurrencyPair { value: String },

    #[error("{domain} request must include at least one {field}")]
    EmptyParameter {
        domain: &'static str,
        field: &'static str,
    },
    #[error("{domain} request limit {limit} must be between 1 and {max}")]
    InvalidLimit {
        domain: &'static str,
        limit: usize,
        max: usize,
    },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
}

/// Failures while loading aggregator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}
