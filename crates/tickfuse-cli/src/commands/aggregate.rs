use tickfuse_core::{
    AggregationRequest, AggregatorConfig, CalendarDate, CryptoParams, CurrencyPair, DateRange,
    EconomicParams, ForexParams, MarketNewsParams, NewsParams, ResultEnvelope, StocksParams,
    Symbol,
};
use tracing::info;

use super::build_aggregator;
use crate::cli::AggregateArgs;
use crate::error::CliError;

pub async fn run(
    args: &AggregateArgs,
    mut config: AggregatorConfig,
) -> Result<ResultEnvelope, CliError> {
    let request = build_request(args)?;
    if let Some(deadline_ms) = args.deadline_ms {
        config.request_deadline_ms = Some(deadline_ms);
        config.validate()?;
    }

    let aggregator = build_aggregator(config);
    info!(domains = ?request.domains(), "running aggregation");
    Ok(aggregator.aggregate(&request).await)
}

fn build_request(args: &AggregateArgs) -> Result<AggregationRequest, CliError> {
    let mut request = AggregationRequest::new().with_cache_mode(args.cache_mode.into());

    if let Some(stocks) = &args.stocks {
        request = request.with_stocks(StocksParams::new(Symbol::parse_list(stocks)?)?);
    }
    if let Some(crypto) = &args.crypto {
        request = request.with_crypto(CryptoParams::new(crypto.split(','), &args.vs)?);
    }
    if let Some(forex) = &args.forex {
        let pairs = forex
            .split(',')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(CurrencyPair::parse)
            .collect::<Result<Vec<_>, _>>()?;
        request = request.with_forex(ForexParams::new(pairs)?);
    }
    if let Some(query) = &args.news {
        request = request.with_news(NewsParams::new(query.as_str(), args.news_limit)?);
    }
    if let Some(series_id) = &args.economic {
        let range = match (&args.from, &args.to) {
            (Some(from), Some(to)) => Some(DateRange::new(
                CalendarDate::parse(from)?,
                CalendarDate::parse(to)?,
            )?),
            (None, None) => None,
            _ => {
                return Err(CliError::Usage(String::from(
                    "--from and --to must be given together",
                )))
            }
        };
        request = request.with_economic(EconomicParams::new(series_id, range)?);
    } else if args.from.is_some() || args.to.is_some() {
        return Err(CliError::Usage(String::from(
            "--from/--to only apply together with --economic",
        )));
    }
    if let Some(category) = &args.market_news {
        request =
            request.with_market_news(MarketNewsParams::new(category, args.market_news_limit)?);
    }

    if request.is_empty() {
        return Err(CliError::Usage(String::from(
            "name at least one domain: --stocks, --crypto, --forex, --news, --economic or --market-news",
        )));
    }
    Ok(request)
}
