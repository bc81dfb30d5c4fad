use std::sync::Arc;

use tracing::info;

use crate::circuit_breaker::{BreakerStatus, CircuitBreaker, CircuitBreakerConfig};
use crate::config::AggregatorConfig;
use crate::Domain;

/// Long-lived breaker per domain, shared by every request of one aggregator.
///
/// Each domain is served by exactly one provider adapter, so the domain name
/// doubles as the breaker (provider) key.
#[derive(Debug, Clone)]
pub struct BreakerRegistry {
    breakers: [Arc<CircuitBreaker>; Domain::COUNT],
}

impl BreakerRegistry {
    pub fn from_config(config: &AggregatorConfig) -> Self {
        Self::with(|domain| config.breaker_for(domain))
    }

    pub fn uniform(config: CircuitBreakerConfig) -> Self {
        Self::with(|_| config)
    }

    fn with(config_for: impl Fn(Domain) -> CircuitBreakerConfig) -> Self {
        Self {
            breakers: Domain::ALL
                .map(|domain| Arc::new(CircuitBreaker::new(domain.as_str(), config_for(domain)))),
        }
    }

    pub fn get(&self, domain: Domain) -> Arc<CircuitBreaker> {
        Arc::clone(&self.breakers[domain.index()])
    }

    /// Status export in canonical domain order.
    pub fn statuses(&self) -> Vec<BreakerStatus> {
        self.breakers.iter().map(|breaker| breaker.status()).collect()
    }

    pub fn reset(&self, domain: Domain) {
        self.breakers[domain.index()].reset();
    }

    pub fn reset_all(&self) {
        for breaker in &self.breakers {
            breaker.reset();
        }
        info!("all circuit breakers reset");
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::uniform(CircuitBreakerConfig::default())
    }
}
