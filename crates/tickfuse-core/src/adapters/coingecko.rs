use std::collections::HashMap;
use std::sync::Arc;

use super::{get_json, invalid_record, wrong_domain};
use crate::data_source::{CryptoBatch, DomainPayload, FetchFuture, ProviderAdapter, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::request::{CryptoParams, DomainParams};
use crate::throttling::RateBudget;
use crate::{CryptoAsset, Domain, UtcDateTime};

const PROVIDER: &str = "coingecko";
const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Crypto spot prices from CoinGecko `/simple/price`. Works without a key;
/// a demo key raises the public rate limit.
#[derive(Clone)]
pub struct CoinGeckoCryptoAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: Option<String>,
    base_url: String,
    rate_budget: Option<RateBudget>,
}

impl CoinGeckoCryptoAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            api_key: None,
            base_url: String::from(DEFAULT_BASE_URL),
            rate_budget: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_rate_budget(mut self, rate_budget: RateBudget) -> Self {
        self.rate_budget = Some(rate_budget);
        self
    }

    async fn fetch_prices(&self, params: &CryptoParams) -> Result<CryptoBatch, SourceError> {
        let vs = params.vs_currency.as_str();
        let mut request = HttpRequest::get(format!("{}/simple/price", self.base_url))
            .with_query("ids", params.ids.join(","))
            .with_query("vs_currencies", vs)
            .with_query("include_market_cap", "true")
            .with_query("include_24hr_vol", "true")
            .with_query("include_24hr_change", "true")
            .with_query("include_last_updated_at", "true");
        if let Some(api_key) = &self.api_key {
            request = request.with_header("x-cg-demo-api-key", api_key);
        }

        // {"bitcoin": {"usd": 67187.3, "usd_market_cap": ..., "last_updated_at": 1711356300}}
        let response: HashMap<String, HashMap<String, Option<f64>>> = get_json(
            self.http_client.as_ref(),
            request,
            PROVIDER,
            self.rate_budget.as_ref(),
        )
        .await?;

        let fetched_at = UtcDateTime::now();
        let mut assets = Vec::with_capacity(params.ids.len());
        // Unknown ids are simply absent from the response.
        for id in &params.ids {
            let Some(fields) = response.get(id) else {
                continue;
            };
            let field = |suffix: &str| fields.get(&format!("{vs}{suffix}")).copied().flatten();

            let Some(price) = field("") else {
                continue;
            };
            let as_of = fields
                .get("last_updated_at")
                .copied()
                .flatten()
                .and_then(|seconds| UtcDateTime::from_unix_timestamp(seconds as i64).ok())
                .unwrap_or(fetched_at);

            let asset = CryptoAsset::new(
                id.clone(),
                vs,
                price,
                field("_market_cap"),
                field("_24h_vol"),
                field("_24h_change"),
                as_of,
            )
            .map_err(|error| invalid_record(PROVIDER, error))?;
            assets.push(asset);
        }

        Ok(CryptoBatch { assets })
    }
}

impl ProviderAdapter for CoinGeckoCryptoAdapter {
    fn domain(&self) -> Domain {
        Domain::Crypto
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn fetch<'a>(&'a self, params: &'a DomainParams) -> FetchFuture<'a> {
        Box::pin(async move {
            match params {
                DomainParams::Crypto(params) => {
                    self.fetch_prices(params).await.map(DomainPayload::Crypto)
                }
                other => Err(wrong_domain(Domain::Crypto, other)),
            }
        })
    }
}
