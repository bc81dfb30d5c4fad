//! CLI argument definitions for tickfuse.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `aggregate` | Fetch any mix of domains in one request and print the envelope |
//! | `breakers` | Print circuit breaker status and registered providers |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--config` | none | JSON configuration file |
//! | `--log-format` | `compact` | Log format on stderr (pretty, json, compact) |
//!
//! # Examples
//!
//! ```bash
//! tickfuse aggregate --stocks AAPL,MSFT --crypto bitcoin --pretty
//! tickfuse aggregate --economic UNRATE --from 2024-01-01 --to 2024-06-30
//! tickfuse aggregate --news "federal reserve" --deadline-ms 3000 --format table
//! tickfuse breakers --config tickfuse.json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tickfuse_core::CacheMode;

use crate::logging::LogFormat;

/// tickfuse - one request, many market data providers, one envelope.
#[derive(Debug, Parser)]
#[command(
    name = "tickfuse",
    author,
    version,
    about = "Resilient multi-provider market data aggregation",
    long_about = "tickfuse fans a single request out to stock, crypto, forex, news, economic \
and market-news providers concurrently. Each provider sits behind its own circuit breaker \
and a shared cache, and the answer is always one JSON envelope whose status degrades from \
success to partial to error as providers fail.\n\
\n\
API keys are read from TICKFUSE_<PROVIDER>_API_KEY or <PROVIDER>_API_KEY \
(ALPHAVANTAGE, COINGECKO, NEWSAPI, FRED, FINNHUB)."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// JSON configuration file (breakers, TTLs, timeouts, rate limits).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log line format. Logs go to stderr; filter with RUST_LOG.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object.
    Json,
    /// One line per domain, for terminals.
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the requested domains concurrently and print one envelope.
    ///
    /// Exit code is 0 for success, 3 for partial and 4 for error.
    ///
    /// # Examples
    ///
    ///   tickfuse aggregate --stocks AAPL,MSFT --news earnings
    ///   tickfuse aggregate --forex EUR/USD,GBP/JPY --cache-mode refresh
    Aggregate(AggregateArgs),

    /// Print the breaker status export and the registered providers.
    Breakers,
}

/// Arguments for the `aggregate` command. At least one domain flag is expected.
#[derive(Debug, Args)]
pub struct AggregateArgs {
    /// Comma-separated equity symbols (AAPL,MSFT).
    #[arg(long)]
    pub stocks: Option<String>,

    /// Comma-separated coin ids (bitcoin,ethereum).
    #[arg(long)]
    pub crypto: Option<String>,

    /// Quote currency for crypto prices.
    #[arg(long, default_value = "usd")]
    pub vs: String,

    /// Comma-separated currency pairs (EUR/USD,GBP/JPY).
    #[arg(long)]
    pub forex: Option<String>,

    /// Free-text news search query.
    #[arg(long)]
    pub news: Option<String>,

    /// Maximum news articles.
    #[arg(long, default_value_t = 20)]
    pub news_limit: usize,

    /// Economic series id (UNRATE, CPIAUCSL).
    #[arg(long)]
    pub economic: Option<String>,

    /// First observation date (YYYY-MM-DD). Requires --to.
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Last observation date (YYYY-MM-DD). Requires --from.
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Market headline category (general, forex, crypto, merger).
    #[arg(long)]
    pub market_news: Option<String>,

    /// Maximum market headlines.
    #[arg(long, default_value_t = 20)]
    pub market_news_limit: usize,

    /// Whole-request deadline in milliseconds; overrides the config file.
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Cache interaction for this request.
    #[arg(long, value_enum, default_value_t = CacheModeArg::Use)]
    pub cache_mode: CacheModeArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheModeArg {
    /// Serve fresh entries from cache, otherwise fetch and store.
    Use,
    /// Always fetch, then store.
    Refresh,
    /// Never read or write the cache.
    Bypass,
}

impl From<CacheModeArg> for CacheMode {
    fn from(value: CacheModeArg) -> Self {
        match value {
            CacheModeArg::Use => Self::Use,
            CacheModeArg::Refresh => Self::Refresh,
            CacheModeArg::Bypass => Self::Bypass,
        }
    }
}
