use crate::report::PerformanceMetrics;
use configuration::AnalyticsParams;
use core_types::ValuationPoint;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// A stateless calculator for deriving performance metrics from a valuation history.
#[derive(Debug, Clone)]
pub struct PerformanceAccountant {
    params: AnalyticsParams,
}

impl Default for PerformanceAccountant {
    fn default() -> Self {
        Self::new(AnalyticsParams::default())
    }
}

impl PerformanceAccountant {
    pub fn new(params: AnalyticsParams) -> Self {
        Self { params }
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// `history` must be in date order, as `ValuationHistory` guarantees. Fewer than
    /// two points yields `PerformanceMetrics::empty()`.
    ///
    /// An account can be wiped out, so values at or below zero are accepted. A daily
    /// return is undefined when the previous value is not positive; such periods are
    /// left out of the return series, while drawdown and total return still cover
    /// every point.
    pub fn compute_metrics(&self, history: &[ValuationPoint]) -> PerformanceMetrics {
        if history.len() < 2 {
            return PerformanceMetrics::empty();
        }

        let mut returns = Vec::with_capacity(history.len() - 1);
        for w in history.windows(2) {
            if w[0].total_value <= Decimal::ZERO {
                tracing::warn!(
                    date = %w[1].date,
                    previous = %w[0].total_value,
                    "return undefined after a non-positive valuation, period skipped"
                );
                continue;
            }
            returns.push(to_f64(w[1].total_value / w[0].total_value - Decimal::ONE));
        }

        let days = f64::from(self.params.trading_days_per_year);
        let daily_rf = self.params.annual_risk_free_rate / days;
        let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
        let downside: Vec<f64> = excess.iter().copied().filter(|r| *r < 0.0).collect();

        let annualize = days.sqrt();
        let mean_excess = mean(&excess);
        let sharpe_ratio = self
            .usable_deviation(&excess)
            .map(|sd| annualize * mean_excess / sd);
        let sortino_ratio = self
            .usable_deviation(&downside)
            .map(|sd| annualize * mean_excess / sd);
        let annualized_volatility = sample_std_dev(&returns).map(|sd| annualize * sd);

        let metrics = PerformanceMetrics {
            sharpe_ratio,
            sortino_ratio,
            max_drawdown: max_drawdown(history),
            total_return: total_return(history),
            annualized_volatility,
            periods: returns.len(),
        };
        tracing::debug!(?metrics, "performance metrics computed");

        metrics
    }

    /// The sample deviation of `values`, unless it is too small to divide by.
    fn usable_deviation(&self, values: &[f64]) -> Option<f64> {
        sample_std_dev(values).filter(|sd| *sd >= self.params.min_std_dev)
    }
}

/// Largest `(peak - value) / peak` against the running peak.
fn max_drawdown(history: &[ValuationPoint]) -> Decimal {
    let mut peak = Decimal::ZERO;
    let mut worst = Decimal::ZERO;
    for point in history {
        if point.total_value > peak {
            peak = point.total_value;
        }
        if peak > Decimal::ZERO {
            let drawdown = (peak - point.total_value) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

/// `last / first - 1`; zero when the series does not start positive.
fn total_return(history: &[ValuationPoint]) -> Decimal {
    match (history.first(), history.last()) {
        (Some(first), Some(last)) if first.total_value > Decimal::ZERO => {
            last.total_value / first.total_value - Decimal::ONE
        }
        _ => Decimal::ZERO,
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation; undefined below two values.
fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}
