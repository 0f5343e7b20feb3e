use crate::error::MarketDataError;
use crate::{MarketData, PriceBar};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Routes every lookup to a primary provider and retries it on a fallback
/// provider when the primary fails.
///
/// Only a failure of both providers is returned to the caller.
pub struct FallbackMarketData {
    primary: Arc<dyn MarketData>,
    fallback: Arc<dyn MarketData>,
}

impl FallbackMarketData {
    pub fn new(primary: Arc<dyn MarketData>, fallback: Arc<dyn MarketData>) -> Self {
        Self { primary, fallback }
    }
}

fn both_failed(primary: MarketDataError, fallback: MarketDataError) -> MarketDataError {
    MarketDataError::AllProvidersFailed {
        primary: primary.to_string(),
        fallback: fallback.to_string(),
    }
}

#[async_trait]
impl MarketData for FallbackMarketData {
    async fn price(&self, instrument: &str, date: NaiveDate) -> Result<Decimal, MarketDataError> {
        match self.primary.price(instrument, date).await {
            Ok(price) => Ok(price),
            Err(primary_err) => {
                tracing::warn!(instrument, %date, error = %primary_err, "primary price lookup failed, trying fallback");
                self.fallback
                    .price(instrument, date)
                    .await
                    .map_err(|fallback_err| both_failed(primary_err, fallback_err))
            }
        }
    }

    async fn price_history(
        &self,
        instrument: &str,
        end: NaiveDate,
        lookback: usize,
    ) -> Result<Vec<PriceBar>, MarketDataError> {
        match self.primary.price_history(instrument, end, lookback).await {
            Ok(history) => Ok(history),
            Err(primary_err) => {
                tracing::warn!(instrument, %end, error = %primary_err, "primary history lookup failed, trying fallback");
                self.fallback
                    .price_history(instrument, end, lookback)
                    .await
                    .map_err(|fallback_err| both_failed(primary_err, fallback_err))
            }
        }
    }

    async fn market_cap(
        &self,
        instrument: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, MarketDataError> {
        match self.primary.market_cap(instrument, date).await {
            Ok(Some(cap)) => Ok(Some(cap)),
            Ok(None) => self.fallback.market_cap(instrument, date).await.or(Ok(None)),
            Err(primary_err) => self
                .fallback
                .market_cap(instrument, date)
                .await
                .map_err(|fallback_err| both_failed(primary_err, fallback_err)),
        }
    }

    async fn trading_dates(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, MarketDataError> {
        match self.primary.trading_dates(start, end).await {
            Ok(dates) => Ok(dates),
            Err(primary_err) => self
                .fallback
                .trading_dates(start, end)
                .await
                .map_err(|fallback_err| both_failed(primary_err, fallback_err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryMarketData;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn fallback_fills_primary_gaps() {
        let primary = InMemoryMarketData::new()
            .with_closes("AAPL", &[(day(1), dec!(150))])
            .unwrap();
        let fallback = InMemoryMarketData::new()
            .with_closes("AAPL", &[(day(1), dec!(149)), (day(4), dec!(151))])
            .unwrap();
        let data = FallbackMarketData::new(Arc::new(primary), Arc::new(fallback));

        assert_eq!(data.price("AAPL", day(1)).await.unwrap(), dec!(150));
        assert_eq!(data.price("AAPL", day(4)).await.unwrap(), dec!(151));
    }

    #[tokio::test]
    async fn double_failure_reports_both_providers() {
        let data = FallbackMarketData::new(
            Arc::new(InMemoryMarketData::new()),
            Arc::new(InMemoryMarketData::new()),
        );

        let err = data.price("AAPL", day(1)).await.unwrap_err();
        assert!(matches!(err, MarketDataError::AllProvidersFailed { .. }));
    }
}
