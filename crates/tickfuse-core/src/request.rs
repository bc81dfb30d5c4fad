//! Aggregation request and per-domain parameters.
//!
//! An [`AggregationRequest`] lists the requested domains in the caller's
//! order, each carrying its own validated parameter set. Every parameter set
//! derives a deterministic cache key from its domain and contents.

use serde::{Deserialize, Serialize};

use crate::cache::CacheMode;
use crate::{CalendarDate, CurrencyPair, Domain, Symbol, ValidationError};

const MAX_NEWS_LIMIT: usize = 100;
const CACHE_KEY_PREFIX: &str = "tickfuse:v1";

/// Equity quote parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StocksParams {
    pub symbols: Vec<Symbol>,
}

impl StocksParams {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, ValidationError> {
        if symbols.is_empty() {
            return Err(ValidationError::EmptyParameter {
                domain: "stocks",
                field: "symbol",
            });
        }
        Ok(Self { symbols })
    }
}

/// Crypto spot price parameters. Ids are provider coin ids (`bitcoin`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoParams {
    pub ids: Vec<String>,
    pub vs_currency: String,
}

impl CryptoParams {
    pub fn new(
        ids: impl IntoIterator<Item = impl AsRef<str>>,
        vs_currency: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        let ids = ids
            .into_iter()
            .map(|id| id.as_ref().trim().to_ascii_lowercase())
            .filter(|id| !id.is_empty())
            .collect::<Vec<_>>();
        if ids.is_empty() {
            return Err(ValidationError::EmptyParameter {
                domain: "crypto",
                field: "coin id",
            });
        }

        let vs_currency = vs_currency.as_ref().trim().to_ascii_lowercase();
        if vs_currency.is_empty() {
            return Err(ValidationError::EmptyParameter {
                domain: "crypto",
                field: "quote currency",
            });
        }

        Ok(Self { ids, vs_currency })
    }
}

/// FX rate parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForexParams {
    pub pairs: Vec<CurrencyPair>,
}

impl ForexParams {
    pub fn new(pairs: Vec<CurrencyPair>) -> Result<Self, ValidationError> {
        if pairs.is_empty() {
            return Err(ValidationError::EmptyParameter {
                domain: "forex",
                field: "currency pair",
            });
        }
        Ok(Self { pairs })
    }
}

/// Free-text news search parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsParams {
    pub query: String,
    pub limit: usize,
}

impl NewsParams {
    pub fn new(query: impl Into<String>, limit: usize) -> Result<Self, ValidationError> {
        let query = query.into().trim().to_owned();
        if query.is_empty() {
            return Err(ValidationError::EmptyParameter {
                domain: "news",
                field: "query term",
            });
        }
        validate_limit("news", limit)?;
        Ok(Self { query, limit })
    }
}

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: CalendarDate,
    to: CalendarDate,
}

impl DateRange {
    pub fn new(from: CalendarDate, to: CalendarDate) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::InvertedDateRange {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(Self { from, to })
    }

    pub fn start(&self) -> CalendarDate {
        self.from
    }

    pub fn end(&self) -> CalendarDate {
        self.to
    }
}

/// Macro indicator series parameters (FRED-style series id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicParams {
    pub series_id: String,
    pub range: Option<DateRange>,
}

impl EconomicParams {
    pub fn new(series_id: impl AsRef<str>, range: Option<DateRange>) -> Result<Self, ValidationError> {
        let series_id = series_id.as_ref().trim().to_ascii_uppercase();
        if series_id.is_empty() {
            return Err(ValidationError::EmptyParameter {
                domain: "economic",
                field: "series id",
            });
        }
        Ok(Self { series_id, range })
    }
}

/// General market headline parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketNewsParams {
    pub category: String,
    pub limit: usize,
}

impl MarketNewsParams {
    pub fn new(category: impl AsRef<str>, limit: usize) -> Result<Self, ValidationError> {
        let category = category.as_ref().trim().to_ascii_lowercase();
        if category.is_empty() {
            return Err(ValidationError::EmptyParameter {
                domain: "marketNews",
                field: "category",
            });
        }
        validate_limit("marketNews", limit)?;
        Ok(Self { category, limit })
    }
}

impl Default for MarketNewsParams {
    fn default() -> Self {
        Self {
            category: String::from("general"),
            limit: 20,
        }
    }
}

/// Parameters for one requested domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "params", rename_all = "camelCase")]
pub enum DomainParams {
    Stocks(StocksParams),
    Crypto(CryptoParams),
    Forex(ForexParams),
    News(NewsParams),
    Economic(EconomicParams),
    MarketNews(MarketNewsParams),
}

impl DomainParams {
    pub const fn domain(&self) -> Domain {
        match self {
            Self::Stocks(_) => Domain::Stocks,
            Self::Crypto(_) => Domain::Crypto,
            Self::Forex(_) => Domain::Forex,
            Self::News(_) => Domain::News,
            Self::Economic(_) => Domain::Economic,
            Self::MarketNews(_) => Domain::MarketNews,
        }
    }

    /// Deterministic cache key: equal parameters always map to the same key,
    /// and keys of different domains never collide.
    pub fn cache_key(&self) -> String {
        let body = match self {
            Self::Stocks(params) => join(params.symbols.iter().map(Symbol::as_str)),
            Self::Crypto(params) => format!(
                "{}@{}",
                join(params.ids.iter().map(String::as_str)),
                params.vs_currency
            ),
            Self::Forex(params) => join(params.pairs.iter().map(ToString::to_string)),
            Self::News(params) => format!("{}#{}", params.query.to_lowercase(), params.limit),
            Self::Economic(params) => match params.range {
                Some(range) => format!("{}@{}..{}", params.series_id, range.from, range.to),
                None => params.series_id.clone(),
            },
            Self::MarketNews(params) => format!("{}#{}", params.category, params.limit),
        };

        format!("{CACHE_KEY_PREFIX}:{}:{body}", self.domain())
    }
}

/// Immutable set of requested domains, in caller-declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationRequest {
    entries: Vec<DomainParams>,
    cache_mode: CacheMode,
}

impl AggregationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a domain. Repeating a domain replaces its parameters but keeps
    /// the position where it was first declared.
    pub fn with(mut self, params: DomainParams) -> Self {
        let domain = params.domain();
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.domain() == domain)
        {
            Some(existing) => *existing = params,
            None => self.entries.push(params),
        }
        self
    }

    pub fn with_stocks(self, params: StocksParams) -> Self {
        self.with(DomainParams::Stocks(params))
    }

    pub fn with_crypto(self, params: CryptoParams) -> Self {
        self.with(DomainParams::Crypto(params))
    }

    pub fn with_forex(self, params: ForexParams) -> Self {
        self.with(DomainParams::Forex(params))
    }

    pub fn with_news(self, params: NewsParams) -> Self {
        self.with(DomainParams::News(params))
    }

    pub fn with_economic(self, params: EconomicParams) -> Self {
        self.with(DomainParams::Economic(params))
    }

    pub fn with_market_news(self, params: MarketNewsParams) -> Self {
        self.with(DomainParams::MarketNews(params))
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    pub fn params(&self) -> &[DomainParams] {
        &self.entries
    }

    pub fn domains(&self) -> Vec<Domain> {
        self.entries.iter().map(DomainParams::domain).collect()
    }

    pub fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_limit(domain: &'static str, limit: usize) -> Result<(), ValidationError> {
    if limit == 0 || limit > MAX_NEWS_LIMIT {
        return Err(ValidationError::InvalidLimit {
            domain,
            limit,
            max: MAX_NEWS_LIMIT,
        });
    }
    Ok(())
}

fn join<S: AsRef<str>>(parts: impl Iterator<Item = S>) -> String {
    parts
        .map(|part| part.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(",")
}
