use crate::error::AnalystError;
use crate::{SignalSource, closes_f64, confidence_from};
use async_trait::async_trait;
use chrono::NaiveDate;
use configuration::MomentumParams;
use core_types::{Direction, Signal};
use market_data::MarketData;
use rust_decimal::Decimal;
use std::sync::Arc;
use ta::Next;
use ta::indicators::RateOfChange as Roc;

/// The rate-of-change momentum analyst.
///
/// Takes a side once the percentage change over `period` bars clears the
/// threshold, and reaches full confidence at twice the threshold.
pub struct MomentumAnalyst {
    id: String,
    params: MomentumParams,
    market_data: Arc<dyn MarketData>,
}

impl MomentumAnalyst {
    pub fn new(params: MomentumParams, market_data: Arc<dyn MarketData>) -> Result<Self, AnalystError> {
        if params.period == 0 {
            return Err(AnalystError::InvalidParameters(
                "Momentum period must be positive".to_string(),
            ));
        }
        if !(params.threshold_pct >= 0.0) {
            return Err(AnalystError::InvalidParameters(
                "Momentum threshold must be non-negative".to_string(),
            ));
        }
        Ok(Self {
            id: "momentum".to_string(),
            params,
            market_data,
        })
    }

    fn rate_of_change(&self, closes: &[f64]) -> Result<f64, AnalystError> {
        let mut roc =
            Roc::new(self.params.period).map_err(|e| AnalystError::IndicatorError(format!("{:?}", e)))?;
        Ok(closes.iter().fold(0.0, |_, &close| roc.next(close)))
    }
}

#[async_trait]
impl SignalSource for MomentumAnalyst {
    fn id(&self) -> &str {
        &self.id
    }

    async fn produce(&self, instrument: &str, as_of: NaiveDate) -> Result<Signal, AnalystError> {
        let needed = self.params.period + 1;
        let history = self
            .market_data
            .price_history(instrument, as_of, needed)
            .await?;

        if history.len() < needed {
            return Ok(Signal::neutral(
                &self.id,
                instrument,
                format!("warming up: {} of {} bars", history.len(), needed),
            ));
        }

        let closes = closes_f64(history.iter().map(|bar| bar.close))?;
        let roc = self.rate_of_change(&closes)?;
        let threshold = self.params.threshold_pct;
        tracing::debug!(instrument, %as_of, roc, threshold, "momentum evaluated");

        let (direction, confidence) = if roc > threshold {
            (Direction::Bullish, confidence_from(roc, threshold * 2.0))
        } else if roc < -threshold {
            (Direction::Bearish, confidence_from(roc, threshold * 2.0))
        } else {
            (Direction::Neutral, Decimal::ZERO)
        };

        Ok(Signal::new(
            &self.id,
            instrument,
            direction,
            confidence,
            format!("ROC{} {:+.2}% (threshold {:.2}%)", self.params.period, roc, threshold),
        )?)
    }
}
