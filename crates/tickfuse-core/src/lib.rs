//! # Tickfuse Core
//!
//! Resilient aggregation engine for near-real-time financial data.
//!
//! ## Overview
//!
//! One [`AggregationRequest`] names any subset of six domains (stocks, crypto,
//! forex, news, economic, marketNews). The [`Aggregator`] fans it out to one
//! provider adapter per domain, concurrently, and always answers with a single
//! [`ResultEnvelope`], degrading from `success` to `partial` to `error` as
//! providers fail.
//!
//! - **Circuit breaker** per provider, shared by all concurrent requests
//! - **Cache port** consulted before any provider call
//! - **Provider adapters** over a swappable HTTP transport
//! - **Result envelope** with timing, cache-hit and call-count metadata
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | HTTP adapters (Alpha Vantage, CoinGecko, ExchangeRate-API, NewsAPI, FRED, Finnhub) |
//! | [`aggregator`] | Orchestrator and builder |
//! | [`breaker_registry`] | One breaker per domain |
//! | [`cache`] | Cache port and in-memory TTL store |
//! | [`circuit_breaker`] | Three-state circuit breaker |
//! | [`config`] | JSON configuration |
//! | [`data_source`] | Adapter trait, payloads, source errors |
//! | [`domain`] | Domain models |
//! | [`envelope`] | Result envelope |
//! | [`error`] | Validation and config errors |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`request`] | Aggregation request and per-domain params |
//! | [`throttling`] | Provider call budgets |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tickfuse_core::{AggregationRequest, Aggregator, StocksParams, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let aggregator = Aggregator::builder().with_real_clients().build();
//!
//!     let request = AggregationRequest::new()
//!         .with_stocks(StocksParams::new(Symbol::parse_list("AAPL,MSFT")?)?);
//!     let envelope = aggregator.aggregate(&request).await;
//!
//!     println!("{}", serde_json::to_string_pretty(&envelope)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ CLI / transport │
//! └────────┬────────┘
//!          │ AggregationRequest
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Aggregator    │────▶│ Cache (port)     │
//! └────────┬────────┘     └──────────────────┘
//!          │ one task per domain
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Circuit Breaker │────▶│ Provider Adapter │
//! │ (per provider)  │     │ + HTTP Client    │
//! └─────────────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ ResultEnvelope  │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! `aggregate` never fails. Provider problems surface as envelope errors:
//!
//! ```rust
//! use tickfuse_core::{EnvelopeStatus, ErrorCode, ResultEnvelope};
//!
//! fn report(envelope: &ResultEnvelope) {
//!     if envelope.status() == EnvelopeStatus::Success {
//!         return;
//!     }
//!     for error in envelope.errors() {
//!         match error.code {
//!             ErrorCode::CircuitOpen => eprintln!("{} is cooling down", error.service),
//!             ErrorCode::Timeout => eprintln!("{} timed out", error.service),
//!             ErrorCode::ProviderError | ErrorCode::Internal => {
//!                 eprintln!("{} failed: {}", error.service, error.message)
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - API keys are read from environment variables or set explicitly, and never logged
//! - Transport errors are stripped of URLs before they reach logs or envelopes

pub mod adapters;
pub mod aggregator;
pub mod breaker_registry;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod request;
pub mod throttling;

// Adapter implementations
pub use adapters::{
    AlphaVantageStocksAdapter, CoinGeckoCryptoAdapter, ExchangeRateForexAdapter,
    FinnhubMarketNewsAdapter, FredEconomicAdapter, NewsApiAdapter,
};

// Orchestration
pub use aggregator::{Aggregator, AggregatorBuilder};

// Circuit breaker
pub use breaker_registry::BreakerRegistry;
pub use circuit_breaker::{
    BreakerStatus, CircuitBreaker, CircuitBreakerConfig, CircuitError, CircuitState,
};

// Caching
pub use cache::{CacheError, CacheFuture, CacheMode, CachePort, CacheStore};

// Configuration
pub use config::{
    AggregatorConfig, BreakerOverride, BreakerSettings, CacheTtls, RateLimitSettings,
    MAX_CACHE_TTL_SECS, MAX_RATE_WINDOW_SECS, MAX_RESET_TIMEOUT_MS,
};

// Adapter contract and payloads
pub use data_source::{
    CryptoBatch, DomainPayload, EconomicSeries, FetchFuture, ForexBatch, NewsBatch,
    ProviderAdapter, QuoteBatch, SourceError, SourceErrorKind,
};

// Domain models
pub use domain::{
    validate_currency_code, CalendarDate, CryptoAsset, CurrencyPair, Domain, FxRate, NewsArticle,
    Observation, Quote, Symbol, UtcDateTime,
};

// Envelope types
pub use envelope::{
    EnvelopeData, EnvelopeError, EnvelopeMetadata, EnvelopeStatus, ErrorCode, Outcome,
    ProviderOutcome, ResultEnvelope,
};

// Error types
pub use error::{ConfigError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpFuture, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};

// Requests
pub use request::{
    AggregationRequest, CryptoParams, DateRange, DomainParams, EconomicParams, ForexParams,
    MarketNewsParams, NewsParams, StocksParams,
};

// Throttling
pub use throttling::RateBudget;
