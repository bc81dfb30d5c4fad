use std::fmt::Write as _;
use std::io::{self, Write};

use serde::Serialize;
use tickfuse_core::{BreakerStatus, Domain, ResultEnvelope};

use crate::cli::OutputFormat;
use crate::commands::BreakerReport;
use crate::error::CliError;

pub fn render_envelope(
    envelope: &ResultEnvelope,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => write_json(envelope, pretty),
        OutputFormat::Table => write_stdout(&envelope_table(envelope)),
    }
}

pub fn render_breakers(
    report: &BreakerReport,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => write_json(report, pretty),
        OutputFormat::Table => write_stdout(&breaker_table(&report.breakers)),
    }
}

fn write_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    write_stdout(&format!("{payload}\n"))
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn envelope_table(envelope: &ResultEnvelope) -> String {
    let metadata = envelope.metadata();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "status={} request_id={} duration_ms={} cache_hits={} api_calls={}",
        envelope.status(),
        envelope.request_id(),
        metadata.total_duration,
        metadata.cache_hits,
        metadata.api_calls_made
    );
    let _ = writeln!(out, "{:<12} {:<16} DETAIL", "DOMAIN", "RESULT");

    for domain in Domain::ALL {
        if let Some(records) = record_count(envelope, domain) {
            let _ = writeln!(out, "{:<12} {:<16} {records} record(s)", domain.as_str(), "ok");
        } else if let Some(error) = envelope.error_for(domain) {
            let _ = writeln!(
                out,
                "{:<12} {:<16} {}",
                domain.as_str(),
                error.code.as_str(),
                error.message
            );
        }
    }
    out
}

fn record_count(envelope: &ResultEnvelope, domain: Domain) -> Option<usize> {
    let data = envelope.data();
    match domain {
        Domain::Stocks => data.stocks.as_ref().map(|batch| batch.quotes.len()),
        Domain::Crypto => data.crypto.as_ref().map(|batch| batch.assets.len()),
        Domain::Forex => data.forex.as_ref().map(|batch| batch.rates.len()),
        Domain::News => data.news.as_ref().map(|batch| batch.articles.len()),
        Domain::Economic => data.economic.as_ref().map(|series| series.observations.len()),
        Domain::MarketNews => data.market_news.as_ref().map(|batch| batch.articles.len()),
    }
}

fn breaker_table(statuses: &[BreakerStatus]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<10} {:>9} {:>10} NEXT_PROBE_MS",
        "BREAKER", "STATE", "FAILURES", "SUCCESSES"
    );
    for status in statuses {
        let _ = writeln!(
            out,
            "{:<12} {:<10} {:>4}/{:<4} {:>5}/{:<4} {}",
            status.name,
            status.state.as_str(),
            status.failure_count,
            status.failure_threshold,
            status.success_count,
            status.success_threshold,
            status
                .next_attempt_in_ms
                .map_or_else(|| String::from("-"), |ms| ms.to_string())
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tickfuse_core::{CircuitBreaker, CircuitBreakerConfig, ErrorCode, ProviderOutcome};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn table_lists_failures_with_their_code() {
        let envelope = ResultEnvelope::assemble(
            Uuid::new_v4(),
            vec![ProviderOutcome::failure(
                Domain::News,
                ErrorCode::CircuitOpen,
                "circuit 'news' is open",
            )],
            Duration::from_millis(3),
        );

        let table = envelope_table(&envelope);

        assert!(table.starts_with("status=error"));
        assert!(table.contains("news"));
        assert!(table.contains("CIRCUIT_OPEN"));
    }

    #[test]
    fn breaker_table_has_one_row_per_breaker() {
        let statuses = ["stocks", "crypto"]
            .map(|name| CircuitBreaker::new(name, CircuitBreakerConfig::default()).status());

        let table = breaker_table(&statuses);

        assert_eq!(table.lines().count(), 3);
        assert!(table.contains("CLOSED"));
    }
}
