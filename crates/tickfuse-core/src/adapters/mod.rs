//! HTTP provider adapters, one per domain.
//!
//! | Domain | Adapter | Upstream |
//! |--------|---------|----------|
//! | stocks | [`AlphaVantageStocksAdapter`] | Alpha Vantage `REALTIME_BULK_QUOTES` |
//! | crypto | [`CoinGeckoCryptoAdapter`] | CoinGecko `/simple/price` |
//! | forex | [`ExchangeRateForexAdapter`] | open.er-api `/v6/latest/USD` |
//! | news | [`NewsApiAdapter`] | NewsAPI `/v2/everything` |
//! | economic | [`FredEconomicAdapter`] | FRED `/series/observations` |
//! | marketNews | [`FinnhubMarketNewsAdapter`] | Finnhub `/news` |
//!
//! Each adapter performs exactly one GET per fetch and never retries.

mod alphavantage;
mod coingecko;
mod exchange_rate;
mod finnhub;
mod fred;
mod newsapi;

pub use alphavantage::AlphaVantageStocksAdapter;
pub use coingecko::CoinGeckoCryptoAdapter;
pub use exchange_rate::ExchangeRateForexAdapter;
pub use finnhub::FinnhubMarketNewsAdapter;
pub use fred::FredEconomicAdapter;
pub use newsapi::NewsApiAdapter;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpErrorKind, HttpRequest};
use crate::request::DomainParams;
use crate::throttling::RateBudget;
use crate::{Domain, ValidationError};

/// Spends one unit of `budget`, performs the call, and decodes a 2xx JSON body.
async fn get_json<T: DeserializeOwned>(
    client: &dyn HttpClient,
    request: HttpRequest,
    provider: &'static str,
    budget: Option<&RateBudget>,
) -> Result<T, SourceError> {
    if let Some(budget) = budget {
        if !budget.try_acquire() {
            return Err(SourceError::rate_limited(format!(
                "{provider} call budget of {} per {}s exhausted",
                budget.limit(),
                budget.window().as_secs()
            )));
        }
    }

    debug!(provider, url = %request.url, "calling provider");
    let response = client
        .execute(request)
        .await
        .map_err(|error| match error.kind() {
            HttpErrorKind::Timeout => SourceError::timeout(format!("{provider}: {error}")),
            HttpErrorKind::Connect | HttpErrorKind::Other => {
                SourceError::unavailable(format!("{provider} transport error: {error}"))
            }
        })?;

    if response.status == 429 {
        return Err(SourceError::rate_limited(format!(
            "{provider} returned status 429"
        )));
    }
    if !response.is_success() {
        return Err(SourceError::unavailable(format!(
            "{provider} returned status {}",
            response.status
        )));
    }

    serde_json::from_str(&response.body).map_err(|error| {
        SourceError::invalid_response(format!("failed to parse {provider} response: {error}"))
    })
}

fn wrong_domain(expected: Domain, params: &DomainParams) -> SourceError {
    SourceError::invalid_request(format!(
        "{expected} adapter cannot serve {} parameters",
        params.domain()
    ))
}

fn invalid_record(provider: &'static str, error: ValidationError) -> SourceError {
    SourceError::invalid_response(format!("{provider} returned an invalid record: {error}"))
}

/// Numbers that some providers ship as strings (`"187.42"`, `"-0.23%"`).
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches('%')
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
