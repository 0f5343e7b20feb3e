use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Risk-adjusted performance of one valuation history.
///
/// The ratios are `None` wherever the underlying deviation is undefined or
/// numerically zero, never infinite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    /// Largest peak-to-trough decline as a fraction of the peak (0.05 = 5%).
    pub max_drawdown: Decimal,
    /// `last / first - 1`.
    pub total_return: Decimal,
    pub annualized_volatility: Option<f64>,
    /// Number of daily returns the statistics were computed over.
    pub periods: usize,
}

impl PerformanceMetrics {
    /// Metrics of a history too short to have any returns.
    pub fn empty() -> Self {
        Self {
            sharpe_ratio: None,
            sortino_ratio: None,
            max_drawdown: Decimal::ZERO,
            total_return: Decimal::ZERO,
            annualized_volatility: None,
            periods: 0,
        }
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::empty()
    }
}
