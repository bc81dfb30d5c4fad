use std::sync::Arc;

use serde::Deserialize;

use super::{get_json, wrong_domain};
use crate::data_source::{DomainPayload, FetchFuture, NewsBatch, ProviderAdapter, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::request::{DomainParams, NewsParams};
use crate::throttling::RateBudget;
use crate::{Domain, NewsArticle, UtcDateTime};

const PROVIDER: &str = "newsapi";
const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";
const REMOVED_MARKER: &str = "[Removed]";

/// Keyword news search via NewsAPI `/everything`, newest first.
#[derive(Clone)]
pub struct NewsApiAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    rate_budget: Option<RateBudget>,
}

impl NewsApiAdapter {
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

    async fn search(&self, params: &NewsParams) -> Result<NewsBatch, SourceError> {
        let request = HttpRequest::get(format!("{}/everything", self.base_url))
            .with_query("q", &params.query)
            .with_query("pageSize", params.limit.to_string())
            .with_query("sortBy", "publishedAt")
            .with_query("language", "en")
            .with_header("X-Api-Key", &self.api_key);

        let response: EverythingResponse = get_json(
            self.http_client.as_ref(),
            request,
            PROVIDER,
            self.rate_budget.as_ref(),
        )
        .await?;

        if response.status != "ok" {
            let message = format!(
                "{PROVIDER}: {}",
                response.message.as_deref().unwrap_or("request rejected")
            );
            return Err(match response.code.as_deref() {
                Some("rateLimited") => SourceError::rate_limited(message),
                _ => SourceError::unavailable(message),
            });
        }

        let articles = response
            .articles
            .into_iter()
            .filter_map(normalize_article)
            .take(params.limit)
            .collect();

        Ok(NewsBatch { articles })
    }
}

impl ProviderAdapter for NewsApiAdapter {
    fn domain(&self) -> Domain {
        Domain::News
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn fetch<'a>(&'a self, params: &'a DomainParams) -> FetchFuture<'a> {
        Box::pin(async move {
            match params {
                DomainParams::News(params) => self.search(params).await.map(DomainPayload::News),
                other => Err(wrong_domain(Domain::News, other)),
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<ArticleRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticleRecord {
    source: Option<ArticleSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

/// Drops records without a title or link, and takedown placeholders.
fn normalize_article(record: ArticleRecord) -> Option<NewsArticle> {
    let title = record.title.filter(|title| title != REMOVED_MARKER)?;
    let url = record.url.filter(|url| !url.is_empty())?;

    Some(NewsArticle {
        title,
        url,
        source: record.source.and_then(|source| source.name),
        summary: record.description,
        published_at: record
            .published_at
            .as_deref()
            .and_then(|raw| UtcDateTime::parse(raw).ok()),
    })
}
