use crate::error::MarketDataError;
use crate::{MarketData, PriceBar};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// A date-indexed price store held entirely in memory.
///
/// This is the data source for backtests: a price file is loaded once up front and
/// every lookup afterwards is a map access.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketData {
    series: BTreeMap<String, BTreeMap<NaiveDate, PriceBar>>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the bar for `instrument` on `bar.date`.
    pub fn insert(&mut self, instrument: &str, bar: PriceBar) -> Result<(), MarketDataError> {
        if bar.close <= Decimal::ZERO {
            return Err(MarketDataError::InvalidData(format!(
                "{} close on {} must be positive, got {}",
                instrument, bar.date, bar.close
            )));
        }
        self.series
            .entry(instrument.to_string())
            .or_default()
            .insert(bar.date, bar);
        Ok(())
    }

    /// Convenience builder for a series of closes without fundamentals.
    pub fn with_closes(
        mut self,
        instrument: &str,
        closes: &[(NaiveDate, Decimal)],
    ) -> Result<Self, MarketDataError> {
        for &(date, close) in closes {
            self.insert(
                instrument,
                PriceBar {
                    date,
                    close,
                    market_cap: None,
                },
            )?;
        }
        Ok(self)
    }

    /// Parses a JSON document of the form `{"AAPL": [{"date": "2024-01-02", "close": 185.64}]}`.
    pub fn from_json_str(json: &str) -> Result<Self, MarketDataError> {
        let raw: BTreeMap<String, Vec<PriceBar>> = serde_json::from_str(json)?;
        let mut store = Self::new();
        for (instrument, bars) in raw {
            for bar in bars {
                store.insert(&instrument, bar)?;
            }
        }
        tracing::debug!(instruments = store.series.len(), "price data loaded");
        Ok(store)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, MarketDataError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    fn bars(&self, instrument: &str) -> Result<&BTreeMap<NaiveDate, PriceBar>, MarketDataError> {
        self.series
            .get(instrument)
            .ok_or_else(|| MarketDataError::UnknownInstrument(instrument.to_string()))
    }
}

#[async_trait]
impl MarketData for InMemoryMarketData {
    async fn price(&self, instrument: &str, date: NaiveDate) -> Result<Decimal, MarketDataError> {
        self.bars(instrument)?
            .get(&date)
            .map(|bar| bar.close)
            .ok_or_else(|| MarketDataError::PriceUnavailable {
                instrument: instrument.to_string(),
                date,
            })
    }

    async fn price_history(
        &self,
        instrument: &str,
        end: NaiveDate,
        lookback: usize,
    ) -> Result<Vec<PriceBar>, MarketDataError> {
        let bars = self.bars(instrument)?;
        let mut history: Vec<PriceBar> = bars
            .range(..=end)
            .rev()
            .take(lookback)
            .map(|(_, bar)| *bar)
            .collect();
        history.reverse();
        Ok(history)
    }

    async fn market_cap(
        &self,
        instrument: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, MarketDataError> {
        Ok(self.bars(instrument)?.get(&date).and_then(|bar| bar.market_cap))
    }

    async fn trading_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, MarketDataError> {
        let dates: BTreeSet<NaiveDate> = self
            .series
            .values()
            .flat_map(|bars| bars.range(start..=end).map(|(date, _)| *date))
            .collect();
        Ok(dates.into_iter().collect())
    }
}
