use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{CalendarDate, Symbol, UtcDateTime, ValidationError};

/// Latest equity quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
    pub change_percent: Option<f64>,
    pub volume: Option<u64>,
    pub currency: String,
    pub as_of: UtcDateTime,
}

impl Quote {
    pub fn new(
        symbol: Symbol,
        price: f64,
        change_percent: Option<f64>,
        volume: Option<u64>,
        currency: impl AsRef<str>,
        as_of: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        validate_optional_finite("change_percent", change_percent)?;

        Ok(Self {
            symbol,
            price,
            change_percent,
            volume,
            currency: validate_currency_code(currency.as_ref())?,
            as_of,
        })
    }
}

/// Spot price of one crypto asset against a quote currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoAsset {
    pub id: String,
    pub vs_currency: String,
    pub price: f64,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub change_24h_percent: Option<f64>,
    pub as_of: UtcDateTime,
}

impl CryptoAsset {
    pub fn new(
        id: impl Into<String>,
        vs_currency: impl Into<String>,
        price: f64,
        market_cap: Option<f64>,
        volume_24h: Option<f64>,
        change_24h_percent: Option<f64>,
        as_of: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        validate_optional_non_negative("market_cap", market_cap)?;
        validate_optional_non_negative("volume_24h", volume_24h)?;
        validate_optional_finite("change_24h_percent", change_24h_percent)?;

        Ok(Self {
            id: id.into(),
            vs_currency: vs_currency.into(),
            price,
            market_cap,
            volume_24h,
            change_24h_percent,
            as_of,
        })
    }
}

/// Ordered currency pair, written `BASE/QUOTE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyPair {
    base: String,
    quote: String,
}

impl CurrencyPair {
    pub fn new(base: &str, quote: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            base: validate_currency_code(base)?,
            quote: validate_currency_code(quote)?,
        })
    }

    /// Accepts `EUR/USD`, `EUR-USD` or `EURUSD`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidCurrencyPair {
            value: input.to_owned(),
        };

        let (base, quote) = match trimmed.split_once(['/', '-']) {
            Some(parts) => parts,
            None if trimmed.len() == 6 && trimmed.is_ascii() => trimmed.split_at(3),
            None => return Err(invalid()),
        };

        Self::new(base, quote).map_err(|_| invalid())
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyPair> for String {
    fn from(value: CurrencyPair) -> Self {
        value.to_string()
    }
}

/// Exchange rate: one unit of `pair.base` costs `rate` units of `pair.quote`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FxRate {
    pub pair: CurrencyPair,
    pub rate: f64,
    pub as_of: UtcDateTime,
}

impl FxRate {
    pub fn new(pair: CurrencyPair, rate: f64, as_of: UtcDateTime) -> Result<Self, ValidationError> {
        validate_non_negative("rate", rate)?;
        Ok(Self { pair, rate, as_of })
    }
}

/// Headline from a news feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub source: Option<String>,
    pub summary: Option<String>,
    pub published_at: Option<UtcDateTime>,
}

/// One dated value of a macro indicator; `None` when the agency has not published it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: CalendarDate,
    pub value: Option<f64>,
}

/// Validate and normalize currency to uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_optional_non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_non_negative(field, value)?;
    }
    Ok(())
}

fn validate_optional_finite(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_currency() {
        assert_eq!(
            validate_currency_code("usd").expect("must normalize"),
            "USD"
        );
        assert!(matches!(
            validate_currency_code("USDT"),
            Err(ValidationError::InvalidCurrency { .. })
        ));
    }

    #[test]
    fn parses_currency_pair_spellings() {
        for raw in ["eur/usd", "EUR-USD", "eurusd"] {
            let pair = CurrencyPair::parse(raw).expect("pair should parse");
            assert_eq!(pair.base(), "EUR");
            assert_eq!(pair.quote(), "USD");
            assert_eq!(pair.to_string(), "EUR/USD");
        }
        assert!(matches!(
            CurrencyPair::parse("EURO/USD"),
            Err(ValidationError::InvalidCurrencyPair { .. })
        ));
    }

    #[test]
    fn rejects_negative_quote_price() {
        let err = Quote::new(
            Symbol::parse("AAPL").expect("symbol"),
            -1.0,
            None,
            None,
            "USD",
            UtcDateTime::now(),
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::NegativeValue { field: "price" }));
    }

    #[test]
    fn rejects_non_finite_crypto_change() {
        let err = CryptoAsset::new(
            "bitcoin",
            "usd",
            60_000.0,
            None,
            None,
            Some(f64::NAN),
            UtcDateTime::now(),
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { .. }));
    }
}
