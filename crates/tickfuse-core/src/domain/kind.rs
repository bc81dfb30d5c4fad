use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Category of financial data served by exactly one provider adapter.
///
/// The declaration order is the canonical order used for breaker status
/// exports and for the envelope `data` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Domain {
    Stocks,
    Crypto,
    Forex,
    News,
    Economic,
    MarketNews,
}

impl Domain {
    pub const COUNT: usize = 6;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Stocks,
        Self::Crypto,
        Self::Forex,
        Self::News,
        Self::Economic,
        Self::MarketNews,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stocks => "stocks",
            Self::Crypto => "crypto",
            Self::Forex => "forex",
            Self::News => "news",
            Self::Economic => "economic",
            Self::MarketNews => "marketNews",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Stocks => 0,
            Self::Crypto => 1,
            Self::Forex => 2,
            Self::News => 3,
            Self::Economic => 4,
            Self::MarketNews => 5,
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value
            .trim()
            .chars()
            .filter(|ch| *ch != '_' && *ch != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "stocks" => Ok(Self::Stocks),
            "crypto" => Ok(Self::Crypto),
            "forex" => Ok(Self::Forex),
            "news" => Ok(Self::News),
            "economic" => Ok(Self::Economic),
            "marketnews" => Ok(Self::MarketNews),
            _ => Err(ValidationError::InvalidDomain {
                value: value.to_owned(),
            }),
        }
    }
}
