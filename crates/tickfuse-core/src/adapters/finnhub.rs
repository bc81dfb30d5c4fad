use std::sync::Arc;

use serde::Deserialize;

use super::{get_json, wrong_domain};
use crate::data_source::{DomainPayload, FetchFuture, NewsBatch, ProviderAdapter, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::request::{DomainParams, MarketNewsParams};
use crate::throttling::RateBudget;
use crate::{Domain, NewsArticle, UtcDateTime};

const PROVIDER: &str = "finnhub";
const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// General market headlines from Finnhub `/news`.
#[derive(Clone)]
pub struct FinnhubMarketNewsAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    rate_budget: Option<RateBudget>,
}

impl FinnhubMarketNewsAdapter {
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

    async fn fetch_headlines(&self, params: &MarketNewsParams) -> Result<NewsBatch, SourceError> {
        let request = HttpRequest::get(format!("{}/news", self.base_url))
            .with_query("category", &params.category)
            .with_query("token", &self.api_key);

        let records: Vec<HeadlineRecord> = get_json(
            self.http_client.as_ref(),
            request,
            PROVIDER,
            self.rate_budget.as_ref(),
        )
        .await?;

        let articles = records
            .into_iter()
            .filter(|record| !record.headline.is_empty() && !record.url.is_empty())
            .take(params.limit)
            .map(|record| NewsArticle {
                title: record.headline,
                url: record.url,
                source: record.source.filter(|source| !source.is_empty()),
                summary: record.summary.filter(|summary| !summary.is_empty()),
                published_at: record
                    .datetime
                    .and_then(|seconds| UtcDateTime::from_unix_timestamp(seconds).ok()),
            })
            .collect();

        Ok(NewsBatch { articles })
    }
}

impl ProviderAdapter for FinnhubMarketNewsAdapter {
    fn domain(&self) -> Domain {
        Domain::MarketNews
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn fetch<'a>(&'a self, params: &'a DomainParams) -> FetchFuture<'a> {
        Box::pin(async move {
            match params {
                DomainParams::MarketNews(params) => {
                    self.fetch_headlines(params).await.map(DomainPayload::MarketNews)
                }
                other => Err(wrong_domain(Domain::MarketNews, other)),
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct HeadlineRecord {
    #[serde(default)]
    headline: String,
    #[serde(default)]
    url: String,
    source: Option<String>,
    summary: Option<String>,
    datetime: Option<i64>,
}
