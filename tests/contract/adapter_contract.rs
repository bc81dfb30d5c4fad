//! Behavior every provider adapter must honor, checked against all six.

use std::sync::{Arc, Mutex};

use tickfuse_core::{
    AggregationRequest, Aggregator, AlphaVantageStocksAdapter, CoinGeckoCryptoAdapter,
    CryptoParams, CurrencyPair, Domain, DomainParams, EconomicParams, EnvelopeStatus,
    ExchangeRateForexAdapter, FinnhubMarketNewsAdapter, ForexParams, FredEconomicAdapter,
    HttpClient, HttpError, HttpErrorKind, HttpFuture, HttpRequest, HttpResponse,
    MarketNewsParams, NewsApiAdapter, NewsParams, ProviderAdapter, RateBudget, SourceErrorKind,
    StocksParams, Symbol,
};

const STOCKS_BODY: &str = r#"{"endpoint": "Realtime Bulk Quotes", "data": [
    {"symbol": "AAPL", "timestamp": "2024-03-20 16:00:00", "open": "175.72", "high": "178.67", "low": "175.09", "close": "178.67", "volume": "53423102", "previous_close": "176.08", "change": "2.59", "change_percent": "1.4709"}
]}"#;
const CRYPTO_BODY: &str = r#"{"bitcoin": {"usd": 67187.3, "usd_market_cap": 1317802988326.25, "usd_24h_vol": 31260929299.52, "usd_24h_change": 3.64, "last_updated_at": 1711356300}}"#;
const FOREX_BODY: &str = r#"{"result": "success", "time_last_update_unix": 1711324951, "base_code": "USD", "rates": {"USD": 1, "EUR": 0.92, "JPY": 151.3}}"#;
const NEWS_BODY: &str = r#"{"status": "ok", "totalResults": 1, "articles": [
    {"source": {"id": null, "name": "Reuters"}, "title": "Fed holds rates", "description": "Policy unchanged", "url": "https://news.test/fed", "publishedAt": "2024-03-20T18:00:00Z"}
]}"#;
const ECONOMIC_BODY: &str = r#"{"observations": [
    {"realtime_start": "2024-04-01", "realtime_end": "2024-04-01", "date": "2024-02-01", "value": "3.9"}
]}"#;
const MARKET_NEWS_BODY: &str = r#"[
    {"category": "top news", "datetime": 1711360800, "headline": "Stocks edge higher", "id": 1, "source": "CNBC", "summary": "", "url": "https://news.test/1"}
]"#;

enum Mode {
    /// Answers by endpoint with a realistic body.
    Canned,
    Status(u16, &'static str),
    Transport(HttpErrorKind),
}

/// Transport stand-in that records every call.
struct FakeProviders {
    mode: Mode,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeProviders {
    fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }

    fn canned(url: &str) -> HttpResponse {
        let body = if url.contains("alphavantage") {
            STOCKS_BODY
        } else if url.contains("coingecko") {
            CRYPTO_BODY
        } else if url.contains("er-api") {
            FOREX_BODY
        } else if url.contains("newsapi") {
            NEWS_BODY
        } else if url.contains("stlouisfed") {
            ECONOMIC_BODY
        } else if url.contains("finnhub") {
            MARKET_NEWS_BODY
        } else {
            return HttpResponse::with_status(404, "{}");
        };
        HttpResponse::ok_json(body)
    }
}

impl HttpClient for FakeProviders {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        let response = match &self.mode {
            Mode::Canned => Ok(Self::canned(&request.url)),
            Mode::Status(status, body) => Ok(HttpResponse::with_status(*status, *body)),
            Mode::Transport(kind) => Err(HttpError::new(*kind, "upstream unreachable")),
        };
        self.requests.lock().expect("lock").push(request);
        Box::pin(async move { response })
    }
}

fn adapters(client: Arc<FakeProviders>) -> Vec<Arc<dyn ProviderAdapter>> {
    vec![
        Arc::new(AlphaVantageStocksAdapter::new(client.clone(), "av-key")),
        Arc::new(CoinGeckoCryptoAdapter::new(client.clone())),
        Arc::new(ExchangeRateForexAdapter::new(client.clone())),
        Arc::new(NewsApiAdapter::new(client.clone(), "news-key")),
        Arc::new(FredEconomicAdapter::new(client.clone(), "fred-key")),
        Arc::new(FinnhubMarketNewsAdapter::new(client, "fh-key")),
    ]
}

fn params_for(domain: Domain) -> DomainParams {
    match domain {
        Domain::Stocks => DomainParams::Stocks(
            StocksParams::new(vec![Symbol::parse("AAPL").expect("valid symbol")])
                .expect("valid params"),
        ),
        Domain::Crypto => DomainParams::Crypto(
            CryptoParams::new(["bitcoin"], "usd").expect("valid params"),
        ),
        Domain::Forex => DomainParams::Forex(
            ForexParams::new(vec![CurrencyPair::parse("EUR/JPY").expect("valid pair")])
                .expect("valid params"),
        ),
        Domain::News => {
            DomainParams::News(NewsParams::new("federal reserve", 5).expect("valid params"))
        }
        Domain::Economic => {
            DomainParams::Economic(EconomicParams::new("UNRATE", None).expect("valid params"))
        }
        Domain::MarketNews => DomainParams::MarketNews(MarketNewsParams::default()),
    }
}

#[tokio::test]
async fn every_adapter_normalizes_a_canned_response_in_one_call() {
    for domain in Domain::ALL {
        // Given a fresh transport serving realistic bodies
        let client = FakeProviders::new(Mode::Canned);
        let adapter = adapter_for(domain, client.clone());

        // When the adapter fetches its own domain
        let payload = adapter
            .fetch(&params_for(adapter.domain()))
            .await
            .unwrap_or_else(|error| panic!("{} failed: {error}", adapter.provider()));

        // Then it returns one non-empty payload of that domain after exactly one call
        assert_eq!(payload.domain(), adapter.domain());
        assert_eq!(payload.len(), 1, "{} payload size", adapter.provider());
        assert_eq!(client.call_count(), 1, "{} call count", adapter.provider());
    }
}

#[tokio::test]
async fn every_adapter_rejects_parameters_of_another_domain() {
    let client = FakeProviders::new(Mode::Canned);
    for adapter in adapters(client.clone()) {
        let foreign = Domain::ALL
            .into_iter()
            .find(|domain| *domain != adapter.domain())
            .expect("another domain");

        let error = adapter
            .fetch(&params_for(foreign))
            .await
            .expect_err("foreign params must fail");

        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    }
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn server_errors_are_unavailable_and_never_retried() {
    let client = FakeProviders::new(Mode::Status(503, "Service Unavailable"));
    for adapter in adapters(client.clone()) {
        let error = adapter
            .fetch(&params_for(adapter.domain()))
            .await
            .expect_err("503 must fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable, "{}", adapter.provider());
        assert!(error.retryable());
    }
    assert_eq!(client.call_count(), Domain::COUNT);
}

#[tokio::test]
async fn throttled_responses_are_rate_limited() {
    let client = FakeProviders::new(Mode::Status(429, "{}"));
    for adapter in adapters(client) {
        let error = adapter
            .fetch(&params_for(adapter.domain()))
            .await
            .expect_err("429 must fail");
        assert_eq!(error.kind(), SourceErrorKind::RateLimited, "{}", adapter.provider());
    }
}

#[tokio::test]
async fn undecodable_bodies_are_invalid_responses() {
    let client = FakeProviders::new(Mode::Status(200, "<html>maintenance</html>"));
    for adapter in adapters(client) {
        let error = adapter
            .fetch(&params_for(adapter.domain()))
            .await
            .expect_err("html must fail");
        assert_eq!(error.kind(), SourceErrorKind::InvalidResponse, "{}", adapter.provider());
        assert!(!error.retryable());
    }
}

#[tokio::test]
async fn transport_failures_are_classified() {
    for (kind, expected) in [
        (HttpErrorKind::Timeout, SourceErrorKind::Timeout),
        (HttpErrorKind::Connect, SourceErrorKind::Unavailable),
    ] {
        let client = FakeProviders::new(Mode::Transport(kind));
        for adapter in adapters(client) {
            let error = adapter
                .fetch(&params_for(adapter.domain()))
                .await
                .expect_err("transport failure must fail");
            assert_eq!(error.kind(), expected, "{}", adapter.provider());
        }
    }
}

#[tokio::test]
async fn exhausted_budget_rejects_without_a_network_call() {
    // Given a stocks adapter allowed one call per minute
    let client = FakeProviders::new(Mode::Canned);
    let adapter = AlphaVantageStocksAdapter::new(client.clone(), "av-key")
        .with_rate_budget(RateBudget::new(std::time::Duration::from_secs(60), 1));
    let params = params_for(Domain::Stocks);

    // When it is called twice in a row
    adapter.fetch(&params).await.expect("first call fits the budget");
    let error = adapter.fetch(&params).await.expect_err("second call is over budget");

    // Then the second call is rate limited and never reaches the transport
    assert_eq!(error.kind(), SourceErrorKind::RateLimited);
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn built_in_adapters_serve_a_full_request() {
    // Given an aggregator wired to the built-in adapters over a fake transport
    let client = FakeProviders::new(Mode::Canned);
    let aggregator = Aggregator::builder()
        .with_http_client(client.clone())
        .with_alphavantage_key("av-key")
        .with_newsapi_key("news-key")
        .with_fred_key("fred-key")
        .with_finnhub_key("fh-key")
        .with_real_clients()
        .build();
    let request = Domain::ALL
        .into_iter()
        .fold(AggregationRequest::new(), |request, domain| {
            request.with(params_for(domain))
        });

    // When every domain is requested
    let envelope = aggregator.aggregate(&request).await;

    // Then all six are present and one call per provider was made
    assert_eq!(envelope.status(), EnvelopeStatus::Success, "{:?}", envelope.errors());
    assert_eq!(envelope.data().domains(), Domain::ALL.to_vec());
    assert_eq!(envelope.metadata().api_calls_made, 6);
    assert_eq!(client.call_count(), 6);

    let forex = envelope.data().forex.as_ref().expect("forex data");
    let cross = forex.rates[0].rate;
    assert!((cross - 151.3 / 0.92).abs() < 1e-9);
}

fn adapter_for(domain: Domain, client: Arc<FakeProviders>) -> Arc<dyn ProviderAdapter> {
    adapters(client)
        .into_iter()
        .find(|adapter| adapter.domain() == domain)
        .expect("adapter for every domain")
}
