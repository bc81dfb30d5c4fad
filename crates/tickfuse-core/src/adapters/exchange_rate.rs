use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use super::{get_json, invalid_record, wrong_domain};
use crate::data_source::{DomainPayload, FetchFuture, ForexBatch, ProviderAdapter, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::request::{DomainParams, ForexParams};
use crate::throttling::RateBudget;
use crate::{Domain, FxRate, UtcDateTime};

const PROVIDER: &str = "exchangerate";
const DEFAULT_BASE_URL: &str = "https://open.er-api.com/v6/latest";
const PIVOT: &str = "USD";

/// FX rates from the open ExchangeRate-API feed.
///
/// One USD-based table is fetched per request and every requested pair is
/// derived as a cross rate `rates[quote] / rates[base]`.
#[derive(Clone)]
pub struct ExchangeRateForexAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    rate_budget: Option<RateBudget>,
}

impl ExchangeRateForexAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
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

    async fn fetch_rates(&self, params: &ForexParams) -> Result<ForexBatch, SourceError> {
        let request = HttpRequest::get(format!("{}/{PIVOT}", self.base_url));
        let response: LatestRatesResponse = get_json(
            self.http_client.as_ref(),
            request,
            PROVIDER,
            self.rate_budget.as_ref(),
        )
        .await?;

        if response.result != "success" {
            return Err(SourceError::unavailable(format!(
                "{PROVIDER} reported {}: {}",
                response.result,
                response.error_type.as_deref().unwrap_or("unknown error")
            )));
        }

        let as_of = response
            .time_last_update_unix
            .and_then(|seconds| UtcDateTime::from_unix_timestamp(seconds).ok())
            .unwrap_or_else(UtcDateTime::now);

        let mut rates = Vec::with_capacity(params.pairs.len());
        for pair in &params.pairs {
            let (Some(base), Some(quote)) = (
                response.rates.get(pair.base()),
                response.rates.get(pair.quote()),
            ) else {
                continue;
            };
            if *base <= 0.0 {
                continue;
            }

            let rate = FxRate::new(pair.clone(), quote / base, as_of)
                .map_err(|error| invalid_record(PROVIDER, error))?;
            rates.push(rate);
        }

        Ok(ForexBatch { rates })
    }
}

impl ProviderAdapter for ExchangeRateForexAdapter {
    fn domain(&self) -> Domain {
        Domain::Forex
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn fetch<'a>(&'a self, params: &'a DomainParams) -> FetchFuture<'a> {
        Box::pin(async move {
            match params {
                DomainParams::Forex(params) => {
                    self.fetch_rates(params).await.map(DomainPayload::Forex)
                }
                other => Err(wrong_domain(Domain::Forex, other)),
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    time_last_update_unix: Option<i64>,
    #[serde(default)]
    rates: HashMap<String, f64>,
}
