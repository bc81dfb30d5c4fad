//! # Domain Models
//!
//! Canonical value types shared by requests, provider adapters and the
//! result envelope.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Domain`] | Data category (stocks, crypto, forex, news, economic, marketNews) |
//! | [`Quote`] | Latest equity quote |
//! | [`CryptoAsset`] | Crypto spot price with 24h stats |
//! | [`CurrencyPair`] / [`FxRate`] | FX pair and its rate |
//! | [`NewsArticle`] | Headline from a news feed |
//! | [`Observation`] | Dated macro indicator value |
//! | [`Symbol`] | Validated ticker |
//! | [`UtcDateTime`] / [`CalendarDate`] | Timestamps and calendar dates |
//!
//! All constructors validate their invariants and return [`ValidationError`](crate::ValidationError).

mod kind;
mod models;
mod symbol;
mod timestamp;

pub use kind::Domain;
pub use models::{
    validate_currency_code, CryptoAsset, CurrencyPair, FxRate, NewsArticle, Observation, Quote,
};
pub use symbol::Symbol;
pub use timestamp::{CalendarDate, UtcDateTime};
