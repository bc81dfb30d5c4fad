use serde::Serialize;
use tickfuse_core::{AggregatorConfig, BreakerStatus, Domain};

use super::build_aggregator;

/// Breaker export plus which domains actually have a provider wired up.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerReport {
    pub registered_domains: Vec<Domain>,
    pub breakers: Vec<BreakerStatus>,
}

pub fn run(config: AggregatorConfig) -> BreakerReport {
    let aggregator = build_aggregator(config);
    BreakerReport {
        registered_domains: aggregator.registered_domains(),
        breakers: aggregator.breaker_statuses(),
    }
}
