mod aggregate;
mod breakers;

use std::path::Path;

use tickfuse_core::{Aggregator, AggregatorConfig};

pub use self::aggregate::run as aggregate;
pub use self::breakers::{run as breakers, BreakerReport};

use crate::error::CliError;

/// Loads `--config` when given, otherwise the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<AggregatorConfig, CliError> {
    match path {
        Some(path) => Ok(AggregatorConfig::from_file(path)?),
        None => Ok(AggregatorConfig::default()),
    }
}

fn build_aggregator(config: AggregatorConfig) -> Aggregator {
    Aggregator::builder()
        .with_config(config)
        .with_real_clients()
        .build()
}
