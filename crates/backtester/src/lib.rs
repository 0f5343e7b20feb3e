//! # Council Backtester
//!
//! Replays the decision pipeline over a historical date range, filling every
//! decision on the execution simulator and marking the portfolio at each close.

use analytics::{PerformanceAccountant, ValuationHistory};
use chrono::NaiveDate;
use configuration::Config;
use core_types::ValuationPoint;
use engine::{CyclePhase, DecisionPipeline, MarkBook};
use executor::{ExecutionSimulator, Portfolio};
use indicatif::{ProgressBar, ProgressStyle};

pub mod error;
pub mod report;

pub use error::BacktestError;
pub use report::{BacktestReport, TradeRecord};

/// The main backtesting engine.
pub struct Backtester {
    pipeline: DecisionPipeline,
    simulator: ExecutionSimulator,
    accountant: PerformanceAccountant,
    portfolio: Portfolio,
    show_progress: bool,
}

impl Backtester {
    pub fn new(config: &Config, pipeline: DecisionPipeline) -> Result<Self, BacktestError> {
        let portfolio = Portfolio::new(
            config.simulation.initial_cash,
            config.simulation.margin_requirement,
        )?;
        Ok(Self {
            pipeline,
            simulator: ExecutionSimulator::new(config.simulation.allow_shorting),
            accountant: PerformanceAccountant::new(config.analytics.clone()),
            portfolio,
            show_progress: false,
        })
    }

    /// Draws a progress bar on stderr while running.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Runs one cycle per trading date in `[start, end]`, in date order.
    ///
    /// Cycle `t + 1` starts only after cycle `t` has recorded its valuation.
    pub async fn run(
        mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BacktestReport, BacktestError> {
        if start > end {
            return Err(BacktestError::InvalidRange { start, end });
        }
        let dates = self.pipeline.market_data().trading_dates(start, end).await?;
        if dates.is_empty() {
            return Err(BacktestError::DataUnavailable { start, end });
        }

        let initial_cash = self.portfolio.cash();
        tracing::info!(
            phase = %CyclePhase::Init,
            %start,
            %end,
            days = dates.len(),
            instruments = self.pipeline.instruments().len(),
            %initial_cash,
            "starting backtest"
        );

        let progress_bar = if self.show_progress {
            ProgressBar::new(dates.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=>-"),
        );

        let mut marks = MarkBook::new();
        let mut history = ValuationHistory::new();
        let mut trades = Vec::new();

        for date in dates {
            let outcome = self.pipeline.run_cycle(&self.portfolio, &mut marks, date).await?;

            tracing::debug!(phase = %CyclePhase::Execute, %date);
            for (instrument, decision) in &outcome.decisions {
                if decision.is_noop() {
                    continue;
                }
                // Decisions only exist for priced instruments.
                let Some(&price) = outcome.prices.get(instrument) else {
                    continue;
                };
                let filled = self.simulator.execute(&mut self.portfolio, decision, price)?;
                trades.push(TradeRecord {
                    date,
                    instrument: instrument.clone(),
                    action: decision.action,
                    requested: decision.quantity,
                    filled,
                    price,
                });
            }

            tracing::debug!(phase = %CyclePhase::RecordValuation, %date);
            let total_value = self.portfolio.total_value(marks.marks())?;
            history.record(ValuationPoint { date, total_value })?;

            progress_bar.set_message(format!("{} {}", date, total_value.round_dp(2)));
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        let metrics = self.accountant.compute_metrics(history.points());
        let final_value = history.last().map_or(initial_cash, |p| p.total_value);
        tracing::info!(
            phase = %CyclePhase::Finalize,
            %final_value,
            total_return = %metrics.total_return,
            max_drawdown = %metrics.max_drawdown,
            sharpe = ?metrics.sharpe_ratio,
            trades = trades.len(),
            "backtest complete"
        );

        Ok(BacktestReport {
            start,
            end,
            instruments: self.pipeline.instruments().to_vec(),
            initial_cash,
            final_value,
            metrics,
            history,
            trades,
            final_portfolio: self.portfolio.snapshot(),
        })
    }
}
