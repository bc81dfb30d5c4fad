use std::sync::Arc;

use serde::Deserialize;

use super::{get_json, invalid_record, parse_decimal, wrong_domain};
use crate::data_source::{DomainPayload, EconomicSeries, FetchFuture, ProviderAdapter, SourceError};
use crate::http_client::{HttpClient, HttpRequest};
use crate::request::{DomainParams, EconomicParams};
use crate::throttling::RateBudget;
use crate::{CalendarDate, Domain, Observation};

const PROVIDER: &str = "fred";
const DEFAULT_BASE_URL: &str = "https://api.stlouisfed.org/fred";
/// FRED's marker for a period with no published value.
const MISSING_VALUE: &str = ".";

/// Macro indicator observations from the St. Louis Fed (FRED).
#[derive(Clone)]
pub struct FredEconomicAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    rate_budget: Option<RateBudget>,
}

impl FredEconomicAdapter {
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

    async fn fetch_series(&self, params: &EconomicParams) -> Result<EconomicSeries, SourceError> {
        let mut request = HttpRequest::get(format!("{}/series/observations", self.base_url))
            .with_query("series_id", &params.series_id)
            .with_query("api_key", &self.api_key)
            .with_query("file_type", "json");
        if let Some(range) = params.range {
            request = request
                .with_query("observation_start", range.start().format_iso())
                .with_query("observation_end", range.end().format_iso());
        }

        let response: ObservationsResponse = get_json(
            self.http_client.as_ref(),
            request,
            PROVIDER,
            self.rate_budget.as_ref(),
        )
        .await?;

        let observations = response
            .observations
            .into_iter()
            .map(normalize_observation)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EconomicSeries {
            series_id: params.series_id.clone(),
            observations,
        })
    }
}

impl ProviderAdapter for FredEconomicAdapter {
    fn domain(&self) -> Domain {
        Domain::Economic
    }

    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn fetch<'a>(&'a self, params: &'a DomainParams) -> FetchFuture<'a> {
        Box::pin(async move {
            match params {
                DomainParams::Economic(params) => {
                    self.fetch_series(params).await.map(DomainPayload::Economic)
                }
                other => Err(wrong_domain(Domain::Economic, other)),
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<ObservationRecord>,
}

#[derive(Debug, Deserialize)]
struct ObservationRecord {
    date: String,
    value: String,
}

fn normalize_observation(record: ObservationRecord) -> Result<Observation, SourceError> {
    let date = CalendarDate::parse(&record.date).map_err(|error| invalid_record(PROVIDER, error))?;
    let value = if record.value.trim() == MISSING_VALUE {
        None
    } else {
        Some(parse_decimal(&record.value).ok_or_else(|| {
            SourceError::invalid_response(format!(
                "{PROVIDER} returned a non-numeric value '{}' for {date}",
                record.value
            ))
        })?)
    };

    Ok(Observation { date, value })
}
