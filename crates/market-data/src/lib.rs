//! # Council Market Data
//!
//! The read-only market data collaborator. Signal sources read price history and
//! fundamentals through it, and the orchestrator reads the prices that decisions are
//! sized and filled against. Nothing in the core ever writes to it.

pub mod error;
pub mod fallback;
pub mod memory;

pub use error::MarketDataError;
pub use fallback::FallbackMarketData;
pub use memory::InMemoryMarketData;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One daily close, optionally with the market capitalisation on that date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: Decimal,
    #[serde(default)]
    pub market_cap: Option<Decimal>,
}

/// Read access to prices and fundamentals.
///
/// Implementations may be remote and slow; all methods are async so callers can
/// bound them with timeouts.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// The closing price of `instrument` on `date`.
    async fn price(&self, instrument: &str, date: NaiveDate) -> Result<Decimal, MarketDataError>;

    /// Up to `lookback` bars ending at `end` (inclusive), oldest first.
    async fn price_history(
        &self,
        instrument: &str,
        end: NaiveDate,
        lookback: usize,
    ) -> Result<Vec<PriceBar>, MarketDataError>;

    /// Market capitalisation of `instrument` on `date`, if the provider has it.
    ///
    /// Only fundamentals-driven signal sources read this; the built-in analysts and
    /// the decision core work from prices alone. Providers without fundamentals keep
    /// the default of `None`.
    async fn market_cap(
        &self,
        _instrument: &str,
        _date: NaiveDate,
    ) -> Result<Option<Decimal>, MarketDataError> {
        Ok(None)
    }

    /// Every date within `[start, end]` on which at least one instrument traded.
    async fn trading_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, MarketDataError>;
}
