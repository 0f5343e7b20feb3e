use crate::error::AnalystError;
use crate::{SignalSource, closes_f64, confidence_from};
use async_trait::async_trait;
use chrono::NaiveDate;
use configuration::TrendParams;
use core_types::{Direction, Signal};
use market_data::MarketData;
use std::sync::Arc;
use ta::Next;
use ta::indicators::SimpleMovingAverage as Sma;

/// Fast/slow spread at which the analyst reaches full confidence (5%).
const FULL_CONFIDENCE_SPREAD: f64 = 0.05;

/// The moving-average trend analyst.
///
/// Bullish while the fast simple moving average sits above the slow one, bearish
/// while it sits below, with confidence growing with the relative spread.
pub struct TrendAnalyst {
    id: String,
    params: TrendParams,
    market_data: Arc<dyn MarketData>,
}

impl TrendAnalyst {
    pub fn new(params: TrendParams, market_data: Arc<dyn MarketData>) -> Result<Self, AnalystError> {
        if params.fast_period == 0 || params.fast_period >= params.slow_period {
            return Err(AnalystError::InvalidParameters(
                "Fast MA period must be positive and less than Slow MA period".to_string(),
            ));
        }
        Ok(Self {
            id: "trend".to_string(),
            params,
            market_data,
        })
    }

    /// Runs both averages over `closes` and returns their final values.
    fn averages(&self, closes: &[f64]) -> Result<(f64, f64), AnalystError> {
        let mut fast = Sma::new(self.params.fast_period)
            .map_err(|e| AnalystError::IndicatorError(format!("{:?}", e)))?;
        let mut slow = Sma::new(self.params.slow_period)
            .map_err(|e| AnalystError::IndicatorError(format!("{:?}", e)))?;

        let mut last = (0.0, 0.0);
        for &close in closes {
            last = (fast.next(close), slow.next(close));
        }
        Ok(last)
    }
}

#[async_trait]
impl SignalSource for TrendAnalyst {
    fn id(&self) -> &str {
        &self.id
    }

    async fn produce(&self, instrument: &str, as_of: NaiveDate) -> Result<Signal, AnalystError> {
        let history = self
            .market_data
            .price_history(instrument, as_of, self.params.slow_period)
            .await?;

        if history.len() < self.params.slow_period {
            return Ok(Signal::neutral(
                &self.id,
                instrument,
                format!(
                    "warming up: {} of {} bars",
                    history.len(),
                    self.params.slow_period
                ),
            ));
        }

        let closes = closes_f64(history.iter().map(|bar| bar.close))?;
        let (fast_ma, slow_ma) = self.averages(&closes)?;
        let spread = if slow_ma > 0.0 { (fast_ma - slow_ma) / slow_ma } else { 0.0 };
        tracing::debug!(instrument, %as_of, fast_ma, slow_ma, spread, "trend evaluated");

        let direction = if spread > 0.0 {
            Direction::Bullish
        } else if spread < 0.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        };
        let confidence = if direction == Direction::Neutral {
            rust_decimal::Decimal::ZERO
        } else {
            confidence_from(spread, FULL_CONFIDENCE_SPREAD)
        };

        Ok(Signal::new(
            &self.id,
            instrument,
            direction,
            confidence,
            format!(
                "SMA{} {:.2} vs SMA{} {:.2} ({:+.2}%)",
                self.params.fast_period,
                fast_ma,
                self.params.slow_period,
                slow_ma,
                spread * 100.0
            ),
        )?)
    }
}
