//! Result envelope: the single stable response object of one aggregation.
//!
//! Wire shape:
//!
//! ```json
//! {
//!   "requestId": "9b2c…",
//!   "timestamp": "2024-03-01T15:30:00Z",
//!   "status": "partial",
//!   "data": { "stocks": { "quotes": [...] } },
//!   "errors": [{ "service": "news", "code": "PROVIDER_ERROR", "message": "..." }],
//!   "metadata": { "totalDuration": 182, "cacheHits": 0, "apiCallsMade": 2 }
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data_source::{CryptoBatch, DomainPayload, EconomicSeries, ForexBatch, NewsBatch, QuoteBatch};
use crate::{Domain, UtcDateTime};

/// Overall request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Partial,
    Error,
}

impl EnvelopeStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Error => "error",
        }
    }

    fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (0, _) => Self::Error,
            (_, 0) => Self::Success,
            _ => Self::Partial,
        }
    }
}

impl Display for EnvelopeStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure classification of one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Breaker rejected the call; no network I/O was attempted.
    CircuitOpen,
    ProviderError,
    Timeout,
    /// The unit of work itself crashed.
    Internal,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CircuitOpen => "CIRCUIT_OPEN",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Internal => "INTERNAL",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub service: Domain,
    pub code: ErrorCode,
    pub message: String,
}

/// Successful payloads keyed by domain name. Absent domains are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stocks: Option<QuoteBatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto: Option<CryptoBatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forex: Option<ForexBatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news: Option<NewsBatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub economic: Option<EconomicSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_news: Option<NewsBatch>,
}

impl EnvelopeData {
    fn insert(&mut self, payload: DomainPayload) {
        match payload {
            DomainPayload::Stocks(batch) => self.stocks = Some(batch),
            DomainPayload::Crypto(batch) => self.crypto = Some(batch),
            DomainPayload::Forex(batch) => self.forex = Some(batch),
            DomainPayload::News(batch) => self.news = Some(batch),
            DomainPayload::Economic(series) => self.economic = Some(series),
            DomainPayload::MarketNews(batch) => self.market_news = Some(batch),
        }
    }

    pub fn contains(&self, domain: Domain) -> bool {
        match domain {
            Domain::Stocks => self.stocks.is_some(),
            Domain::Crypto => self.crypto.is_some(),
            Domain::Forex => self.forex.is_some(),
            Domain::News => self.news.is_some(),
            Domain::Economic => self.economic.is_some(),
            Domain::MarketNews => self.market_news.is_some(),
        }
    }

    /// Domains present, in canonical order.
    pub fn domains(&self) -> Vec<Domain> {
        Domain::ALL
            .into_iter()
            .filter(|domain| self.contains(*domain))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.domains().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    /// Wall-clock span of the fan-out, in milliseconds.
    pub total_duration: u64,
    pub cache_hits: u32,
    pub api_calls_made: u32,
}

/// How one domain unit ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(DomainPayload),
    Failure { code: ErrorCode, message: String },
}

/// Settled result of one requested domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOutcome {
    pub domain: Domain,
    pub outcome: Outcome,
    /// Served from cache without touching the breaker or the adapter.
    pub cache_hit: bool,
    /// The adapter was actually invoked (through a closed or half-open breaker).
    pub api_call: bool,
}

impl ProviderOutcome {
    pub fn success(domain: Domain, payload: DomainPayload) -> Self {
        Self {
            domain,
            outcome: Outcome::Success(payload),
            cache_hit: false,
            api_call: true,
        }
    }

    pub fn cached(domain: Domain, payload: DomainPayload) -> Self {
        Self {
            domain,
            outcome: Outcome::Success(payload),
            cache_hit: true,
            api_call: false,
        }
    }

    pub fn failure(domain: Domain, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            domain,
            outcome: Outcome::Failure {
                code,
                message: message.into(),
            },
            cache_hit: false,
            api_call: false,
        }
    }

    pub fn with_api_call(mut self, api_call: bool) -> Self {
        self.api_call = api_call;
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }
}

/// Immutable aggregation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    request_id: Uuid,
    timestamp: UtcDateTime,
    status: EnvelopeStatus,
    data: EnvelopeData,
    errors: Vec<EnvelopeError>,
    metadata: EnvelopeMetadata,
}

impl ResultEnvelope {
    /// Builds the envelope from every settled outcome, in the order given.
    ///
    /// Zero outcomes yields `status = error` with empty `data`.
    pub fn assemble(
        request_id: Uuid,
        outcomes: Vec<ProviderOutcome>,
        total_duration: Duration,
    ) -> Self {
        let mut data = EnvelopeData::default();
        let mut errors = Vec::new();
        let mut metadata = EnvelopeMetadata {
            total_duration: u64::try_from(total_duration.as_millis()).unwrap_or(u64::MAX),
            ..EnvelopeMetadata::default()
        };
        let mut succeeded = 0;

        for outcome in outcomes {
            if outcome.cache_hit {
                metadata.cache_hits += 1;
            }
            if outcome.api_call {
                metadata.api_calls_made += 1;
            }
            match outcome.outcome {
                Outcome::Success(payload) => {
                    succeeded += 1;
                    data.insert(payload);
                }
                Outcome::Failure { code, message } => errors.push(EnvelopeError {
                    service: outcome.domain,
                    code,
                    message,
                }),
            }
        }

        Self {
            request_id,
            timestamp: UtcDateTime::now(),
            status: EnvelopeStatus::from_counts(succeeded, errors.len()),
            data,
            errors,
            metadata,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn timestamp(&self) -> UtcDateTime {
        self.timestamp
    }

    pub fn status(&self) -> EnvelopeStatus {
        self.status
    }

    pub fn data(&self) -> &EnvelopeData {
        &self.data
    }

    pub fn errors(&self) -> &[EnvelopeError] {
        &self.errors
    }

    pub fn metadata(&self) -> EnvelopeMetadata {
        self.metadata
    }

    pub fn error_for(&self, domain: Domain) -> Option<&EnvelopeError> {
        self.errors.iter().find(|error| error.service == domain)
    }
}
