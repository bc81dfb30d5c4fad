//! Aggregation orchestrator.
//!
//! [`Aggregator::aggregate`] fans one [`AggregationRequest`] out to one task
//! per requested domain, waits for every task to settle (or for the request
//! deadline), and folds the outcomes into a [`ResultEnvelope`]. It never
//! fails: every problem becomes an `errors` entry.
//!
//! Per domain unit:
//!
//! ```text
//! cache read (mode = use) ── hit ──▶ cached outcome (no breaker, no adapter)
//!        │ miss / cache error
//!        ▼
//! breaker.execute(timeout(adapter.fetch)) ── Ok ──▶ cache write (mode = use|refresh)
//!        │
//!        ├── Open ─────────────▶ CIRCUIT_OPEN
//!        ├── Operation(timeout) ▶ TIMEOUT
//!        └── Operation(other) ──▶ PROVIDER_ERROR
//! ```

use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters::{
    AlphaVantageStocksAdapter, CoinGeckoCryptoAdapter, ExchangeRateForexAdapter,
    FinnhubMarketNewsAdapter, FredEconomicAdapter, NewsApiAdapter,
};
use crate::breaker_registry::BreakerRegistry;
use crate::cache::{CacheMode, CachePort, CacheStore};
use crate::circuit_breaker::{BreakerStatus, CircuitBreaker, CircuitError};
use crate::config::AggregatorConfig;
use crate::data_source::{DomainPayload, ProviderAdapter, SourceError, SourceErrorKind};
use crate::envelope::{ErrorCode, ProviderOutcome, ResultEnvelope};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::request::{AggregationRequest, DomainParams};
use crate::Domain;

/// Long-lived orchestrator. Cheap to clone; clones share breakers and cache.
#[derive(Clone)]
pub struct Aggregator {
    adapters: HashMap<Domain, Arc<dyn ProviderAdapter>>,
    breakers: Arc<BreakerRegistry>,
    cache: Arc<dyn CachePort>,
    config: Arc<AggregatorConfig>,
}

impl Aggregator {
    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::new()
    }

    /// Runs one aggregation. Always returns a well-formed envelope.
    pub async fn aggregate(&self, request: &AggregationRequest) -> ResultEnvelope {
        let request_id = Uuid::new_v4();
        let span = info_span!("aggregate", %request_id, domains = request.len());
        self.fan_out(request_id, request).instrument(span).await
    }

    async fn fan_out(&self, request_id: Uuid, request: &AggregationRequest) -> ResultEnvelope {
        let started = Instant::now();
        if request.is_empty() {
            warn!("aggregation request names no domains");
            return ResultEnvelope::assemble(request_id, Vec::new(), started.elapsed());
        }

        let deadline = self
            .config
            .request_deadline()
            .map(|deadline| started + deadline);

        let units = request
            .params()
            .iter()
            .map(|params| {
                let unit = self.unit(params.clone(), request.cache_mode());
                let domain = params.domain();
                let invoked = Arc::clone(&unit.invoked);
                let span = info_span!("domain", domain = domain.as_str());
                (domain, invoked, tokio::spawn(unit.run().instrument(span)))
            })
            .collect::<Vec<_>>();

        let mut outcomes = Vec::with_capacity(units.len());
        for (domain, invoked, mut handle) in units {
            let joined = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, &mut handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        handle.abort();
                        warn!(domain = domain.as_str(), "request deadline reached; unit abandoned");
                        outcomes.push(
                            ProviderOutcome::failure(
                                domain,
                                ErrorCode::Timeout,
                                format!("{domain} did not settle before the request deadline"),
                            )
                            .with_api_call(invoked.load(Ordering::SeqCst)),
                        );
                        continue;
                    }
                },
                None => handle.await,
            };

            outcomes.push(joined.unwrap_or_else(|error| {
                crashed(domain, &error).with_api_call(invoked.load(Ordering::SeqCst))
            }));
        }

        let envelope = ResultEnvelope::assemble(request_id, outcomes, started.elapsed());
        info!(
            status = %envelope.status(),
            cache_hits = envelope.metadata().cache_hits,
            api_calls = envelope.metadata().api_calls_made,
            duration_ms = envelope.metadata().total_duration,
            "aggregation settled"
        );
        envelope
    }

    fn unit(&self, params: DomainParams, cache_mode: CacheMode) -> DomainUnit {
        let domain = params.domain();
        DomainUnit {
            adapter: self.adapters.get(&domain).cloned(),
            breaker: self.breakers.get(domain),
            cache: Arc::clone(&self.cache),
            cache_mode,
            ttl: self.config.ttl_for(domain),
            provider_timeout: self.config.provider_timeout(),
            invoked: Arc::new(AtomicBool::new(false)),
            params,
        }
    }

    /// Breaker status export, one entry per domain in canonical order.
    pub fn breaker_statuses(&self) -> Vec<BreakerStatus> {
        self.breakers.statuses()
    }

    pub fn reset_breaker(&self, domain: Domain) {
        self.breakers.reset(domain);
    }

    pub fn reset_breakers(&self) {
        self.breakers.reset_all();
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Domains with a registered adapter, in canonical order.
    pub fn registered_domains(&self) -> Vec<Domain> {
        Domain::ALL
            .into_iter()
            .filter(|domain| self.adapters.contains_key(domain))
            .collect()
    }
}

fn crashed(domain: Domain, error: &JoinError) -> ProviderOutcome {
    let message = if error.is_panic() {
        format!("{domain} unit panicked")
    } else {
        format!("{domain} unit was cancelled")
    };
    warn!(domain = domain.as_str(), %message, "domain unit crashed");
    ProviderOutcome::failure(domain, ErrorCode::Internal, message)
}

/// Everything one spawned domain task needs, owned.
struct DomainUnit {
    params: DomainParams,
    adapter: Option<Arc<dyn ProviderAdapter>>,
    breaker: Arc<CircuitBreaker>,
    cache: Arc<dyn CachePort>,
    cache_mode: CacheMode,
    ttl: Duration,
    provider_timeout: Option<Duration>,
    /// Set once the adapter is actually called, so abandoned units still count.
    invoked: Arc<AtomicBool>,
}

impl DomainUnit {
    async fn run(self) -> ProviderOutcome {
        let domain = self.params.domain();
        let key = self.params.cache_key();

        if self.cache_mode.reads() {
            if let Some(payload) = self.read_cache(&key).await {
                debug!(%key, "cache hit");
                return ProviderOutcome::cached(domain, payload);
            }
            debug!(%key, "cache miss");
        }

        let Some(adapter) = self.adapter.clone() else {
            warn!("no provider adapter registered");
            return ProviderOutcome::failure(
                domain,
                ErrorCode::ProviderError,
                format!("no provider adapter registered for {domain}"),
            );
        };

        let invoked = Arc::clone(&self.invoked);
        let provider_timeout = self.provider_timeout;
        let params = &self.params;
        let result = self
            .breaker
            .execute(move || async move {
                invoked.store(true, Ordering::SeqCst);
                let payload = match provider_timeout {
                    Some(limit) => tokio::time::timeout(limit, adapter.fetch(params))
                        .await
                        .map_err(|_| {
                            SourceError::timeout(format!(
                                "{} did not answer within {}ms",
                                adapter.provider(),
                                limit.as_millis()
                            ))
                        })??,
                    None => adapter.fetch(params).await?,
                };
                if payload.domain() != domain {
                    return Err(SourceError::invalid_response(format!(
                        "{} returned a {} payload for a {domain} request",
                        adapter.provider(),
                        payload.domain()
                    )));
                }
                Ok::<_, SourceError>(payload)
            })
            .await;

        match result {
            Ok(payload) => {
                debug!(records = payload.len(), "provider call succeeded");
                if self.cache_mode.writes() {
                    self.write_cache(&key, &payload).await;
                }
                ProviderOutcome::success(domain, payload)
            }
            Err(error @ CircuitError::Open { .. }) => {
                debug!(%error, "call rejected by open circuit");
                ProviderOutcome::failure(domain, ErrorCode::CircuitOpen, error.to_string())
            }
            Err(CircuitError::Operation(error)) => {
                warn!(code = error.code(), error = error.message(), "provider call failed");
                let code = match error.kind() {
                    SourceErrorKind::Timeout => ErrorCode::Timeout,
                    _ => ErrorCode::ProviderError,
                };
                ProviderOutcome::failure(domain, code, error.message()).with_api_call(true)
            }
        }
    }

    /// Any read problem degrades to a miss.
    async fn read_cache(&self, key: &str) -> Option<DomainPayload> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(error) => {
                warn!(%error, "cache read failed; treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<DomainPayload>(&raw) {
            Ok(payload) if payload.domain() == self.params.domain() => Some(payload),
            Ok(payload) => {
                warn!(cached = %payload.domain(), "cached payload belongs to another domain");
                None
            }
            Err(error) => {
                warn!(%error, "cached payload could not be decoded");
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, payload: &DomainPayload) {
        if self.ttl.is_zero() {
            return;
        }
        let raw = match serde_json::to_string(payload) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(%error, "payload could not be encoded for the cache");
                return;
            }
        };
        if let Err(error) = self.cache.set(key, raw, self.ttl).await {
            warn!(%error, "cache write failed");
        }
    }
}

/// Assembles an [`Aggregator`].
///
/// ```rust,ignore
/// let aggregator = Aggregator::builder()
///     .with_config(AggregatorConfig::from_file("tickfuse.json")?)
///     .with_real_clients()
///     .build();
/// ```
#[derive(Default)]
pub struct AggregatorBuilder {
    config: AggregatorConfig,
    cache: Option<Arc<dyn CachePort>>,
    adapters: HashMap<Domain, Arc<dyn ProviderAdapter>>,
    http_client: Option<Arc<dyn HttpClient>>,
    use_real_clients: bool,
    alphavantage_api_key: Option<String>,
    coingecko_api_key: Option<String>,
    newsapi_api_key: Option<String>,
    fred_api_key: Option<String>,
    finnhub_api_key: Option<String>,
}

impl AggregatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CachePort>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Registers `adapter` for its domain, replacing any earlier one.
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.domain(), adapter);
        self
    }

    /// Transport used by the built-in HTTP adapters. Defaults to reqwest.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Registers the built-in HTTP adapters.
    ///
    /// Keys not set explicitly are read from `TICKFUSE_<PROVIDER>_API_KEY`,
    /// falling back to `<PROVIDER>_API_KEY`. Providers that need a key are
    /// skipped when none is found; CoinGecko and the FX feed work without one.
    pub fn with_real_clients(mut self) -> Self {
        self.use_real_clients = true;
        self.alphavantage_api_key = self
            .alphavantage_api_key
            .or_else(|| env_api_key("ALPHAVANTAGE"));
        self.coingecko_api_key = self.coingecko_api_key.or_else(|| env_api_key("COINGECKO"));
        self.newsapi_api_key = self.newsapi_api_key.or_else(|| env_api_key("NEWSAPI"));
        self.fred_api_key = self.fred_api_key.or_else(|| env_api_key("FRED"));
        self.finnhub_api_key = self.finnhub_api_key.or_else(|| env_api_key("FINNHUB"));
        self
    }

    pub fn with_alphavantage_key(mut self, key: impl Into<String>) -> Self {
        self.alphavantage_api_key = Some(key.into());
        self
    }

    pub fn with_coingecko_key(mut self, key: impl Into<String>) -> Self {
        self.coingecko_api_key = Some(key.into());
        self
    }

    pub fn with_newsapi_key(mut self, key: impl Into<String>) -> Self {
        self.newsapi_api_key = Some(key.into());
        self
    }

    pub fn with_fred_key(mut self, key: impl Into<String>) -> Self {
        self.fred_api_key = Some(key.into());
        self
    }

    pub fn with_finnhub_key(mut self, key: impl Into<String>) -> Self {
        self.finnhub_api_key = Some(key.into());
        self
    }

    pub fn build(mut self) -> Aggregator {
        if self.use_real_clients {
            self.register_http_adapters();
        }

        let aggregator = Aggregator {
            breakers: Arc::new(BreakerRegistry::from_config(&self.config)),
            cache: self.cache.unwrap_or_else(|| Arc::new(CacheStore::new())),
            config: Arc::new(self.config),
            adapters: self.adapters,
        };
        info!(domains = ?aggregator.registered_domains(), "aggregator ready");
        aggregator
    }

    /// Explicitly registered adapters win over the built-in ones.
    fn register_http_adapters(&mut self) {
        let http_client = self
            .http_client
            .clone()
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let budget = |domain| self.config.rate_budget_for(domain);
        let mut built: Vec<Arc<dyn ProviderAdapter>> = Vec::new();

        if let Some(key) = &self.alphavantage_api_key {
            let mut adapter = AlphaVantageStocksAdapter::new(Arc::clone(&http_client), key);
            if let Some(budget) = budget(Domain::Stocks) {
                adapter = adapter.with_rate_budget(budget);
            }
            built.push(Arc::new(adapter));
        }

        let mut crypto = CoinGeckoCryptoAdapter::new(Arc::clone(&http_client));
        if let Some(key) = &self.coingecko_api_key {
            crypto = crypto.with_api_key(key);
        }
        if let Some(budget) = budget(Domain::Crypto) {
            crypto = crypto.with_rate_budget(budget);
        }
        built.push(Arc::new(crypto));

        let mut forex = ExchangeRateForexAdapter::new(Arc::clone(&http_client));
        if let Some(budget) = budget(Domain::Forex) {
            forex = forex.with_rate_budget(budget);
        }
        built.push(Arc::new(forex));

        if let Some(key) = &self.newsapi_api_key {
            let mut adapter = NewsApiAdapter::new(Arc::clone(&http_client), key);
            if let Some(budget) = budget(Domain::News) {
                adapter = adapter.with_rate_budget(budget);
            }
            built.push(Arc::new(adapter));
        }

        if let Some(key) = &self.fred_api_key {
            let mut adapter = FredEconomicAdapter::new(Arc::clone(&http_client), key);
            if let Some(budget) = budget(Domain::Economic) {
                adapter = adapter.with_rate_budget(budget);
            }
            built.push(Arc::new(adapter));
        }

        if let Some(key) = &self.finnhub_api_key {
            let mut adapter = FinnhubMarketNewsAdapter::new(Arc::clone(&http_client), key);
            if let Some(budget) = budget(Domain::MarketNews) {
                adapter = adapter.with_rate_budget(budget);
            }
            built.push(Arc::new(adapter));
        }

        for adapter in built {
            self.adapters.entry(adapter.domain()).or_insert(adapter);
        }
    }
}

fn env_api_key(provider: &str) -> Option<String> {
    env::var(format!("TICKFUSE_{provider}_API_KEY"))
        .or_else(|_| env::var(format!("{provider}_API_KEY")))
        .ok()
        .filter(|key| !key.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::RecordingHttpClient;
    use crate::data_source::QuoteBatch;
    use crate::envelope::EnvelopeStatus;
    use crate::request::StocksParams;
    use crate::Symbol;

    #[test]
    fn real_clients_skip_providers_without_keys() {
        let aggregator = Aggregator::builder()
            .with_http_client(Arc::new(RecordingHttpClient::json("{}")))
            .with_fred_key("fred-key")
            .build_with_real_clients_only();

        let domains = aggregator.registered_domains();
        assert!(domains.contains(&Domain::Crypto));
        assert!(domains.contains(&Domain::Forex));
        assert!(domains.contains(&Domain::Economic));
    }

    #[tokio::test]
    async fn explicit_adapter_wins_over_built_in_one() {
        let client = Arc::new(RecordingHttpClient::json(
            r#"{"data": [{"symbol": "AAPL", "close": "101.5"}]}"#,
        ));
        let explicit = AlphaVantageStocksAdapter::new(client.clone(), "explicit-key");
        let aggregator = Aggregator::builder()
            .with_http_client(Arc::new(RecordingHttpClient::json("{}")))
            .with_alphavantage_key("builder-key")
            .with_adapter(Arc::new(explicit))
            .build_with_real_clients_only();

        let request = AggregationRequest::new().with_stocks(
            StocksParams::new(vec![Symbol::parse("AAPL").expect("valid symbol")])
                .expect("valid params"),
        );
        let envelope = aggregator.aggregate(&request).await;

        assert_eq!(envelope.status(), EnvelopeStatus::Success);
        assert_eq!(
            envelope.data().stocks.as_ref().map(|batch: &QuoteBatch| batch.quotes.len()),
            Some(1)
        );
        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query_value("apikey"), Some("explicit-key"));
    }

    impl AggregatorBuilder {
        /// `with_real_clients` without touching the process environment.
        fn build_with_real_clients_only(mut self) -> Aggregator {
            self.use_real_clients = true;
            self.build()
        }
    }
}
