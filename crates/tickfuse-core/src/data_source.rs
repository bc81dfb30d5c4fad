//! Provider adapter contract and normalized payloads.
//!
//! Every domain is served by one [`ProviderAdapter`]. An adapter turns one
//! [`DomainParams`] into exactly one upstream call and returns a
//! [`DomainPayload`] in the canonical shape, or a classified [`SourceError`].
//! Adapters never retry, cache, or guard themselves with breakers; the
//! orchestrator owns all of that.
//!
//! # Payloads
//!
//! | Domain | Payload | Contents |
//! |--------|---------|----------|
//! | stocks | [`QuoteBatch`] | [`Quote`] per symbol |
//! | crypto | [`CryptoBatch`] | [`CryptoAsset`] per coin id |
//! | forex | [`ForexBatch`] | [`FxRate`] per pair |
//! | news | [`NewsBatch`] | [`NewsArticle`] per headline |
//! | economic | [`EconomicSeries`] | [`Observation`] per date |
//! | marketNews | [`NewsBatch`] | [`NewsArticle`] per headline |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::request::DomainParams;
use crate::{CryptoAsset, Domain, FxRate, NewsArticle, Observation, Quote};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    InvalidResponse,
    Timeout,
}

/// Classified provider failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unavailable, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidResponse, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Timeout, message)
    }

    fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a later attempt could plausibly succeed. Informational only.
    pub const fn retryable(&self) -> bool {
        matches!(
            self.kind,
            SourceErrorKind::Unavailable | SourceErrorKind::RateLimited | SourceErrorKind::Timeout
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::InvalidResponse => "source.invalid_response",
            SourceErrorKind::Timeout => "source.timeout",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Normalized quote batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBatch {
    pub quotes: Vec<Quote>,
}

/// Normalized crypto spot batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoBatch {
    pub assets: Vec<CryptoAsset>,
}

/// Normalized FX batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForexBatch {
    pub rates: Vec<FxRate>,
}

/// Headlines, newest first as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsBatch {
    pub articles: Vec<NewsArticle>,
}

/// Observations of one macro series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomicSeries {
    pub series_id: String,
    pub observations: Vec<Observation>,
}

/// Canonical payload of one domain. The serialized form is what the cache
/// stores, so the tag doubles as a guard against cross-domain cache reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "payload", rename_all = "camelCase")]
pub enum DomainPayload {
    Stocks(QuoteBatch),
    Crypto(CryptoBatch),
    Forex(ForexBatch),
    News(NewsBatch),
    Economic(EconomicSeries),
    MarketNews(NewsBatch),
}

impl DomainPayload {
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

    /// Number of records carried, for logging.
    pub fn len(&self) -> usize {
        match self {
            Self::Stocks(batch) => batch.quotes.len(),
            Self::Crypto(batch) => batch.assets.len(),
            Self::Forex(batch) => batch.rates.len(),
            Self::News(batch) | Self::MarketNews(batch) => batch.articles.len(),
            Self::Economic(series) => series.observations.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<DomainPayload, SourceError>> + Send + 'a>>;

/// Provider adapter contract.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`domain`](ProviderAdapter::domain) | Domain this adapter serves |
/// | [`provider`](ProviderAdapter::provider) | Upstream provider name, for logs |
/// | [`fetch`](ProviderAdapter::fetch) | One upstream call, normalized |
///
/// `fetch` must fail with [`SourceErrorKind::InvalidRequest`] when handed
/// parameters of another domain.
pub trait ProviderAdapter: Send + Sync {
    fn domain(&self) -> Domain;

    fn provider(&self) -> &'static str;

    fn fetch<'a>(&'a self, params: &'a DomainParams) -> FetchFuture<'a>;
}
