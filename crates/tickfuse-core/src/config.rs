//! Aggregator configuration.
//!
//! Loaded from camelCase JSON; every field is optional and falls back to the
//! defaults below.
//!
//! ```json
//! {
//!   "breaker": { "failureThreshold": 5, "successThreshold": 2, "resetTimeoutMs": 60000 },
//!   "breakerOverrides": { "news": { "failureThreshold": 3 } },
//!   "cacheTtlSecs": { "stocks": 60, "forex": 300 },
//!   "providerTimeoutMs": 10000,
//!   "requestDeadlineMs": 15000,
//!   "rateLimits": { "stocks": { "windowSecs": 60, "limit": 5 } }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::throttling::RateBudget;
use crate::{ConfigError, Domain};

/// Longest accepted cache freshness window (30 days).
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;
/// Longest accepted rate-limit window (1 day).
pub const MAX_RATE_WINDOW_SECS: u64 = 24 * 60 * 60;
/// Longest accepted breaker reset timeout (1 day).
pub const MAX_RESET_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1_000;

/// Serializable breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout_ms: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout_ms: 60_000,
        }
    }
}

/// Per-domain breaker override. Unset fields inherit the `breaker` section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreakerOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_timeout_ms: Option<u64>,
}

impl BreakerOverride {
    pub fn apply(&self, base: BreakerSettings) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.failure_threshold.unwrap_or(base.failure_threshold),
            success_threshold: self.success_threshold.unwrap_or(base.success_threshold),
            reset_timeout_ms: self.reset_timeout_ms.unwrap_or(base.reset_timeout_ms),
        }
    }
}

impl From<BreakerSettings> for CircuitBreakerConfig {
    fn from(value: BreakerSettings) -> Self {
        Self {
            failure_threshold: value.failure_threshold,
            success_threshold: value.success_threshold,
            reset_timeout: Duration::from_millis(value.reset_timeout_ms),
        }
    }
}

/// Freshness window per domain, in seconds. Zero disables caching for that domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheTtls {
    pub stocks: u64,
    pub crypto: u64,
    pub forex: u64,
    pub news: u64,
    pub economic: u64,
    pub market_news: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            stocks: 60,
            crypto: 60,
            forex: 300,
            news: 600,
            economic: 3_600,
            market_news: 300,
        }
    }
}

impl CacheTtls {
    pub const fn secs_for(&self, domain: Domain) -> u64 {
        match domain {
            Domain::Stocks => self.stocks,
            Domain::Crypto => self.crypto,
            Domain::Forex => self.forex,
            Domain::News => self.news,
            Domain::Economic => self.economic,
            Domain::MarketNews => self.market_news,
        }
    }
}

/// Provider call budget: at most `limit` calls per `window_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSettings {
    pub window_secs: u64,
    pub limit: u32,
}

impl RateLimitSettings {
    pub fn budget(&self) -> RateBudget {
        RateBudget::new(Duration::from_secs(self.window_secs), self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregatorConfig {
    pub breaker: BreakerSettings,
    pub breaker_overrides: BTreeMap<Domain, BreakerOverride>,
    pub cache_ttl_secs: CacheTtls,
    pub provider_timeout_ms: Option<u64>,
    pub request_deadline_ms: Option<u64>,
    pub rate_limits: BTreeMap<Domain, RateLimitSettings>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            breaker: BreakerSettings::default(),
            breaker_overrides: BTreeMap::new(),
            cache_ttl_secs: CacheTtls::default(),
            provider_timeout_ms: Some(10_000),
            request_deadline_ms: None,
            rate_limits: BTreeMap::from([
                // Alpha Vantage free tier.
                (
                    Domain::Stocks,
                    RateLimitSettings {
                        window_secs: 60,
                        limit: 5,
                    },
                ),
                (
                    Domain::MarketNews,
                    RateLimitSettings {
                        window_secs: 60,
                        limit: 60,
                    },
                ),
            ]),
        }
    }
}

impl AggregatorConfig {
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let scopes = std::iter::once(("default", self.breaker)).chain(
            self.breaker_overrides
                .iter()
                .map(|(domain, settings)| (domain.as_str(), settings.apply(self.breaker))),
        );
        for (scope, settings) in scopes {
            if settings.failure_threshold == 0 || settings.success_threshold == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{scope} breaker thresholds must be greater than zero"
                )));
            }
            if settings.reset_timeout_ms > MAX_RESET_TIMEOUT_MS {
                return Err(ConfigError::Invalid(format!(
                    "{scope} breaker reset timeout must not exceed {MAX_RESET_TIMEOUT_MS} ms"
                )));
            }
        }

        for domain in Domain::ALL {
            if self.cache_ttl_secs.secs_for(domain) > MAX_CACHE_TTL_SECS {
                return Err(ConfigError::Invalid(format!(
                    "{domain} cache TTL must not exceed {MAX_CACHE_TTL_SECS} seconds"
                )));
            }
        }

        for (domain, limit) in &self.rate_limits {
            if limit.limit == 0 || limit.window_secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{domain} rate limit needs a non-zero window and limit"
                )));
            }
            if limit.window_secs > MAX_RATE_WINDOW_SECS {
                return Err(ConfigError::Invalid(format!(
                    "{domain} rate limit window must not exceed {MAX_RATE_WINDOW_SECS} seconds"
                )));
            }
        }

        if self.provider_timeout_ms == Some(0) || self.request_deadline_ms == Some(0) {
            return Err(ConfigError::Invalid(String::from(
                "timeouts must be greater than zero when set",
            )));
        }

        Ok(())
    }

    /// Breaker thresholds for `domain`, honoring per-domain overrides.
    pub fn breaker_for(&self, domain: Domain) -> CircuitBreakerConfig {
        self.breaker_overrides
            .get(&domain)
            .map_or(self.breaker, |overrides| overrides.apply(self.breaker))
            .into()
    }

    pub fn ttl_for(&self, domain: Domain) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.secs_for(domain))
    }

    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_deadline(&self) -> Option<Duration> {
        self.request_deadline_ms.map(Duration::from_millis)
    }

    pub fn rate_budget_for(&self, domain: Domain) -> Option<RateBudget> {
        self.rate_limits.get(&domain).map(RateLimitSettings::budget)
    }
}
