use std::sync::Arc;

use serde::Deserialize;

use super::{get_json, invalid_record, parse_decimal, wrong_domain};
use crate::data_source::{DomainPayload, FetchFuture, ProviderAdapter, QuoteBatch, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::request::{DomainParams, StocksParams};
use crate::throttling::RateBudget;
use crate::{Domain, Quote, Symbol, UtcDateTime};

const PROVIDER: &str = "alphavantage";
const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Equity quotes from Alpha Vantage. All symbols of a request travel in one
/// bulk call.
#[derive(Clone)]
pub struct AlphaVantageStocksAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    rate_budget: Option<RateBudget>,
}

impl AlphaVantageStocksAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: String::from(DEFAULT_BASE_URL),
            rate_budget: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_rate_budget(mut self, rate_budget: RateBudget) -> Self {
        self.rate_budget = Some(rate_budget);
        self
    }

    async fn fetch_quotes(&self, params: &StocksParams) -> Result<QuoteBatch, SourceError> {
        let symbols = params
            .symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let request = HttpRequest::get(&self.base_url)
            .with_query("function", "REALTIME_BULK_QUOTES")
            .with_query("symbol", symbols)
            .with_query("apikey", &self.api_key);

        let response: BulkQuotesResponse = get_json(
            self.http_client.as_ref(),
            request,
            PROVIDER,
            self.rate_budget.as_ref(),
        )
        .await?;

        // Alpha Vantage reports quota and key problems with HTTP 200.
        if let Some(note) = response.note {
            return Err(SourceError::rate_limited(format!("{PROVIDER}: {note}")));
        }
        if let Some(message) = response.error_message.or(response.information) {
            return Err(SourceError::unavailable(format!("{PROVIDER}: {message}")));
        }

        let as_of = UtcDateTime::now();
        let quotes = response
            .data
            .into_iter()
            .map(|row| normalize_quote(row, as_of))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QuoteBatch { quotes })
    }
}

impl ProviderAdapter for AlphaVantageStocksAdapter {
    fn domain(&self) -> Domain {
        Domain::Stocks
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn fetch<'a>(&'a self, params: &'a DomainParams) -> FetchFuture<'a> {
        Box::pin(async move {
            match params {
                DomainParams::Stocks(params) => {
                    self.fetch_quotes(params).await.map(DomainPayload::Stocks)
                }
                other => Err(wrong_domain(Domain::Stocks, other)),
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct BulkQuotesResponse {
    #[serde(default)]
    data: Vec<BulkQuoteRow>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BulkQuoteRow {
    symbol: String,
    close: String,
    volume: Option<String>,
    change_percent: Option<String>,
}

fn normalize_quote(row: BulkQuoteRow, as_of: UtcDateTime) -> Result<Quote, SourceError> {
    let symbol = Symbol::parse(&row.symbol).map_err(|error| invalid_record(PROVIDER, error))?;
    let price = parse_decimal(&row.close).ok_or_else(|| {
        SourceError::invalid_response(format!(
            "{PROVIDER} returned a non-numeric price '{}' for {symbol}",
            row.close
        ))
    })?;
    let volume = row
        .volume
        .as_deref()
        .and_then(|raw| raw.trim().parse::<u64>().ok());
    let change_percent = row.change_percent.as_deref().and_then(parse_decimal);

    Quote::new(symbol, price, change_percent, volume, "USD", as_of)
        .map_err(|error| invalid_record(PROVIDER, error))
}
