use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tickfuse_core::{
    AggregationRequest, Aggregator, AggregatorConfig, BreakerSettings, CacheError, CacheFuture,
    CacheMode, CachePort, CacheStore, CircuitState, Domain, DomainParams, DomainPayload,
    EnvelopeStatus, ErrorCode, FetchFuture, NewsArticle, NewsBatch, NewsParams, ProviderAdapter,
    Quote, QuoteBatch, SourceError, StocksParams, Symbol, UtcDateTime,
};

#[derive(Clone)]
enum Script {
    Succeed(DomainPayload),
    Fail(SourceError),
    Hang(Duration),
}

/// Adapter that plays back one scripted behavior and counts invocations.
struct ScriptedAdapter {
    domain: Domain,
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedAdapter {
    fn new(domain: Domain, script: Script) -> Arc<Self> {
        Arc::new(Self {
            domain,
            script,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProviderAdapter for ScriptedAdapter {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn provider(&self) -> &'static str {
        "scripted"
    }

    fn fetch<'a>(&'a self, _params: &'a DomainParams) -> FetchFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.clone();
        Box::pin(async move {
            match script {
                Script::Succeed(payload) => Ok(payload),
                Script::Fail(error) => Err(error),
                Script::Hang(duration) => {
                    tokio::time::sleep(duration).await;
                    Err(SourceError::unavailable("woke up too late"))
                }
            }
        })
    }
}

/// Cache whose backing store is down.
struct BrokenCache;

impl CachePort for BrokenCache {
    fn get<'a>(&'a self, _key: &'a str) -> CacheFuture<'a, Option<String>> {
        Box::pin(async { Err(CacheError::read("connection refused")) })
    }

    fn set<'a>(&'a self, _key: &'a str, _value: String, _ttl: Duration) -> CacheFuture<'a, ()> {
        Box::pin(async { Err(CacheError::write("connection refused")) })
    }
}

fn as_of() -> UtcDateTime {
    UtcDateTime::parse("2024-03-20T16:00:00Z").expect("valid timestamp")
}

fn quotes() -> DomainPayload {
    let quote = Quote::new(
        Symbol::parse("AAPL").expect("valid symbol"),
        189.25,
        Some(0.5),
        Some(52_000_000),
        "USD",
        as_of(),
    )
    .expect("valid quote");
    DomainPayload::Stocks(QuoteBatch {
        quotes: vec![quote],
    })
}

fn headlines() -> DomainPayload {
    DomainPayload::News(NewsBatch {
        articles: vec![NewsArticle {
            title: String::from("Fed holds rates"),
            url: String::from("https://news.test/fed"),
            source: Some(String::from("Reuters")),
            summary: None,
            published_at: Some(as_of()),
        }],
    })
}

fn stocks_request() -> AggregationRequest {
    AggregationRequest::new().with_stocks(
        StocksParams::new(Symbol::parse_list("AAPL").expect("valid symbols"))
            .expect("valid params"),
    )
}

fn stocks_and_news_request() -> AggregationRequest {
    stocks_request().with_news(NewsParams::new("federal reserve", 5).expect("valid params"))
}

#[tokio::test]
async fn one_failing_provider_degrades_to_partial() {
    // Given stocks succeeds and news is down
    let stocks = ScriptedAdapter::new(Domain::Stocks, Script::Succeed(quotes()));
    let news = ScriptedAdapter::new(
        Domain::News,
        Script::Fail(SourceError::unavailable("newsapi returned HTTP 503")),
    );
    let aggregator = Aggregator::builder()
        .with_adapter(stocks.clone())
        .with_adapter(news.clone())
        .build();

    // When both are requested
    let envelope = aggregator.aggregate(&stocks_and_news_request()).await;

    // Then the envelope is partial with stocks data and one news error
    assert_eq!(envelope.status(), EnvelopeStatus::Partial);
    assert_eq!(envelope.data().domains(), vec![Domain::Stocks]);
    assert_eq!(envelope.errors().len(), 1);
    let error = envelope.error_for(Domain::News).expect("news error");
    assert_eq!(error.code, ErrorCode::ProviderError);
    assert!(error.message.contains("503"));
    assert_eq!(envelope.metadata().api_calls_made, 2);
    assert_eq!(envelope.metadata().cache_hits, 0);
}

#[tokio::test]
async fn all_providers_succeeding_is_success() {
    let aggregator = Aggregator::builder()
        .with_adapter(ScriptedAdapter::new(Domain::Stocks, Script::Succeed(quotes())))
        .with_adapter(ScriptedAdapter::new(Domain::News, Script::Succeed(headlines())))
        .build();

    let envelope = aggregator.aggregate(&stocks_and_news_request()).await;

    assert_eq!(envelope.status(), EnvelopeStatus::Success);
    assert!(envelope.errors().is_empty());
    assert_eq!(envelope.data().domains(), vec![Domain::Stocks, Domain::News]);

    let json = serde_json::to_value(&envelope).expect("envelope serializes");
    assert_eq!(json["status"], "success");
    assert!(json["data"]["stocks"].is_object());
    assert!(json["data"]["news"].is_object());
    assert!(json["data"].get("crypto").is_none());
    assert_eq!(json["metadata"]["apiCallsMade"], 2);
}

#[tokio::test]
async fn every_provider_failing_is_error() {
    let aggregator = Aggregator::builder()
        .with_adapter(ScriptedAdapter::new(
            Domain::Stocks,
            Script::Fail(SourceError::rate_limited("alphavantage: quota exhausted")),
        ))
        .with_adapter(ScriptedAdapter::new(
            Domain::News,
            Script::Fail(SourceError::invalid_response("newsapi: malformed body")),
        ))
        .build();

    let envelope = aggregator.aggregate(&stocks_and_news_request()).await;

    assert_eq!(envelope.status(), EnvelopeStatus::Error);
    assert!(envelope.data().is_empty());
    assert_eq!(envelope.errors().len(), 2);
}

#[tokio::test]
async fn empty_request_is_an_error_envelope() {
    let aggregator = Aggregator::builder().build();

    let envelope = aggregator.aggregate(&AggregationRequest::new()).await;

    assert_eq!(envelope.status(), EnvelopeStatus::Error);
    assert!(envelope.data().is_empty());
    assert!(envelope.errors().is_empty());
    assert_eq!(envelope.metadata().api_calls_made, 0);
}

#[tokio::test]
async fn errors_follow_request_order() {
    // Given news declared before stocks, both failing
    let aggregator = Aggregator::builder()
        .with_adapter(ScriptedAdapter::new(
            Domain::Stocks,
            Script::Fail(SourceError::unavailable("down")),
        ))
        .with_adapter(ScriptedAdapter::new(
            Domain::News,
            Script::Fail(SourceError::unavailable("down")),
        ))
        .build();
    let request = AggregationRequest::new()
        .with_news(NewsParams::new("earnings", 3).expect("valid params"))
        .with_stocks(StocksParams::new(Symbol::parse_list("MSFT").expect("valid")).expect("valid"));

    let envelope = aggregator.aggregate(&request).await;

    let services = envelope
        .errors()
        .iter()
        .map(|error| error.service)
        .collect::<Vec<_>>();
    assert_eq!(services, vec![Domain::News, Domain::Stocks]);
}

#[tokio::test(start_paused = true)]
async fn second_request_is_served_from_cache() {
    // Given a warm-up request populated the cache
    let stocks = ScriptedAdapter::new(Domain::Stocks, Script::Succeed(quotes()));
    let aggregator = Aggregator::builder()
        .with_adapter(stocks.clone())
        .with_cache(Arc::new(CacheStore::new()))
        .build();
    let first = aggregator.aggregate(&stocks_request()).await;
    assert_eq!(first.metadata().api_calls_made, 1);

    // When the same request runs again within the TTL
    let second = aggregator.aggregate(&stocks_request()).await;

    // Then it is answered from cache without calling the provider
    assert_eq!(second.status(), EnvelopeStatus::Success);
    assert_eq!(second.metadata().cache_hits, 1);
    assert_eq!(second.metadata().api_calls_made, 0);
    assert_eq!(second.data(), first.data());
    assert_eq!(stocks.calls(), 1);

    // And once the 60s stocks TTL passes the provider is called again
    tokio::time::advance(Duration::from_secs(61)).await;
    let third = aggregator.aggregate(&stocks_request()).await;
    assert_eq!(third.metadata().cache_hits, 0);
    assert_eq!(stocks.calls(), 2);
}

#[tokio::test]
async fn refresh_and_bypass_skip_the_cache_read() {
    let stocks = ScriptedAdapter::new(Domain::Stocks, Script::Succeed(quotes()));
    let cache = Arc::new(CacheStore::new());
    let aggregator = Aggregator::builder()
        .with_adapter(stocks.clone())
        .with_cache(cache.clone())
        .build();

    let bypass = aggregator
        .aggregate(&stocks_request().with_cache_mode(CacheMode::Bypass))
        .await;
    assert_eq!(bypass.metadata().api_calls_made, 1);
    assert!(cache.is_empty().await);

    let refresh = aggregator
        .aggregate(&stocks_request().with_cache_mode(CacheMode::Refresh))
        .await;
    assert_eq!(refresh.metadata().cache_hits, 0);
    assert_eq!(cache.len().await, 1);

    let cached = aggregator.aggregate(&stocks_request()).await;
    assert_eq!(cached.metadata().cache_hits, 1);
    assert_eq!(stocks.calls(), 2);
}

#[tokio::test]
async fn broken_cache_falls_through_to_the_provider() {
    let stocks = ScriptedAdapter::new(Domain::Stocks, Script::Succeed(quotes()));
    let aggregator = Aggregator::builder()
        .with_adapter(stocks.clone())
        .with_cache(Arc::new(BrokenCache))
        .build();

    let envelope = aggregator.aggregate(&stocks_request()).await;

    assert_eq!(envelope.status(), EnvelopeStatus::Success);
    assert_eq!(envelope.metadata().cache_hits, 0);
    assert_eq!(envelope.metadata().api_calls_made, 1);
    assert_eq!(stocks.calls(), 1);
}

#[tokio::test]
async fn unstorable_ttl_keeps_the_fetched_payload() {
    // Given a stocks TTL too large for the clock, set without validation
    let mut config = AggregatorConfig::default();
    config.cache_ttl_secs.stocks = u64::MAX;
    let stocks = ScriptedAdapter::new(Domain::Stocks, Script::Succeed(quotes()));
    let aggregator = Aggregator::builder()
        .with_config(config)
        .with_adapter(stocks.clone())
        .with_cache(Arc::new(CacheStore::new()))
        .build();

    // When the provider succeeds
    let envelope = aggregator.aggregate(&stocks_request()).await;

    // Then the payload is returned and the write is simply skipped
    assert_eq!(envelope.status(), EnvelopeStatus::Success);
    assert!(envelope.errors().is_empty());
    assert_eq!(envelope.data().domains(), vec![Domain::Stocks]);
    assert_eq!(aggregator.breaker_statuses()[0].state, CircuitState::Closed);
}

#[tokio::test]
async fn open_circuit_short_circuits_without_calling_the_provider() {
    // Given a stocks breaker that trips on the first failure
    let config = AggregatorConfig {
        breaker: BreakerSettings {
            failure_threshold: 1,
            ..BreakerSettings::default()
        },
        ..AggregatorConfig::default()
    };
    let stocks = ScriptedAdapter::new(
        Domain::Stocks,
        Script::Fail(SourceError::unavailable("HTTP 500")),
    );
    let aggregator = Aggregator::builder()
        .with_config(config)
        .with_adapter(stocks.clone())
        .build();
    let tripped = aggregator.aggregate(&stocks_request()).await;
    assert_eq!(
        tripped.error_for(Domain::Stocks).map(|error| error.code),
        Some(ErrorCode::ProviderError)
    );

    // When the next request arrives while the circuit is open
    let rejected = aggregator.aggregate(&stocks_request()).await;

    // Then it fails fast with CIRCUIT_OPEN and no provider call
    assert_eq!(rejected.status(), EnvelopeStatus::Error);
    assert_eq!(
        rejected.error_for(Domain::Stocks).map(|error| error.code),
        Some(ErrorCode::CircuitOpen)
    );
    assert_eq!(rejected.metadata().api_calls_made, 0);
    assert_eq!(stocks.calls(), 1);

    let status = aggregator
        .breaker_statuses()
        .into_iter()
        .find(|status| status.name == "stocks")
        .expect("stocks breaker");
    assert_eq!(status.state, CircuitState::Open);

    // And a manual reset lets calls through again
    aggregator.reset_breaker(Domain::Stocks);
    let _ = aggregator.aggregate(&stocks_request()).await;
    assert_eq!(stocks.calls(), 2);
}

#[tokio::test]
async fn breakers_are_isolated_per_domain() {
    let config = AggregatorConfig {
        breaker: BreakerSettings {
            failure_threshold: 1,
            ..BreakerSettings::default()
        },
        ..AggregatorConfig::default()
    };
    let aggregator = Aggregator::builder()
        .with_config(config)
        .with_adapter(ScriptedAdapter::new(
            Domain::News,
            Script::Fail(SourceError::unavailable("down")),
        ))
        .with_adapter(ScriptedAdapter::new(Domain::Stocks, Script::Succeed(quotes())))
        .build();

    let _ = aggregator.aggregate(&stocks_and_news_request()).await;
    let envelope = aggregator.aggregate(&stocks_and_news_request()).await;

    assert_eq!(envelope.status(), EnvelopeStatus::Partial);
    assert_eq!(
        envelope.error_for(Domain::News).map(|error| error.code),
        Some(ErrorCode::CircuitOpen)
    );
    assert!(envelope.data().contains(Domain::Stocks));
}

#[tokio::test(start_paused = true)]
async fn slow_provider_times_out_and_counts_as_a_failure() {
    let config = AggregatorConfig {
        provider_timeout_ms: Some(100),
        ..AggregatorConfig::default()
    };
    let aggregator = Aggregator::builder()
        .with_config(config)
        .with_adapter(ScriptedAdapter::new(
            Domain::Stocks,
            Script::Hang(Duration::from_secs(30)),
        ))
        .with_adapter(ScriptedAdapter::new(Domain::News, Script::Succeed(headlines())))
        .build();

    let envelope = aggregator.aggregate(&stocks_and_news_request()).await;

    assert_eq!(envelope.status(), EnvelopeStatus::Partial);
    assert_eq!(
        envelope.error_for(Domain::Stocks).map(|error| error.code),
        Some(ErrorCode::Timeout)
    );
    assert_eq!(envelope.metadata().api_calls_made, 2);
    let stocks_status = &aggregator.breaker_statuses()[0];
    assert_eq!(stocks_status.failure_count, 1);
}

#[tokio::test(start_paused = true)]
async fn request_deadline_abandons_unsettled_domains() {
    // Given a request deadline of 50ms and no per-provider timeout
    let config = AggregatorConfig {
        provider_timeout_ms: None,
        request_deadline_ms: Some(50),
        ..AggregatorConfig::default()
    };
    let aggregator = Aggregator::builder()
        .with_config(config)
        .with_adapter(ScriptedAdapter::new(
            Domain::Stocks,
            Script::Hang(Duration::from_secs(30)),
        ))
        .with_adapter(ScriptedAdapter::new(Domain::News, Script::Succeed(headlines())))
        .build();

    // When stocks never answers
    let envelope = aggregator.aggregate(&stocks_and_news_request()).await;

    // Then stocks is reported as TIMEOUT and news still arrives
    assert_eq!(envelope.status(), EnvelopeStatus::Partial);
    let error = envelope.error_for(Domain::Stocks).expect("stocks error");
    assert_eq!(error.code, ErrorCode::Timeout);
    assert!(envelope.data().contains(Domain::News));
    assert_eq!(envelope.metadata().api_calls_made, 2);
    assert!(envelope.metadata().total_duration < 1_000);
}

#[tokio::test]
async fn unregistered_domain_is_a_provider_error() {
    let aggregator = Aggregator::builder()
        .with_adapter(ScriptedAdapter::new(Domain::Stocks, Script::Succeed(quotes())))
        .build();

    let envelope = aggregator.aggregate(&stocks_and_news_request()).await;

    assert_eq!(envelope.status(), EnvelopeStatus::Partial);
    let error = envelope.error_for(Domain::News).expect("news error");
    assert_eq!(error.code, ErrorCode::ProviderError);
    assert!(error.message.contains("no provider adapter registered"));
    assert_eq!(envelope.metadata().api_calls_made, 1);
}

#[tokio::test]
async fn payload_for_another_domain_is_rejected() {
    // Given a stocks adapter that answers with news
    let aggregator = Aggregator::builder()
        .with_adapter(ScriptedAdapter::new(Domain::Stocks, Script::Succeed(headlines())))
        .build();

    let envelope = aggregator.aggregate(&stocks_request()).await;

    assert_eq!(envelope.status(), EnvelopeStatus::Error);
    assert_eq!(
        envelope.error_for(Domain::Stocks).map(|error| error.code),
        Some(ErrorCode::ProviderError)
    );
    assert!(envelope.data().stocks.is_none());
}

#[tokio::test]
async fn every_envelope_gets_a_fresh_request_id() {
    let aggregator = Aggregator::builder()
        .with_adapter(ScriptedAdapter::new(Domain::Stocks, Script::Succeed(quotes())))
        .build();
    let request = stocks_request().with_cache_mode(CacheMode::Bypass);

    let first = aggregator.aggregate(&request).await;
    let second = aggregator.aggregate(&request).await;

    assert_ne!(first.request_id(), second.request_id());
}
