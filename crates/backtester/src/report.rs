use crate::error::BacktestError;
use analytics::{PerformanceMetrics, ValuationHistory};
use chrono::NaiveDate;
use core_types::Action;
use executor::PortfolioSnapshot;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One decision as the simulator filled it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub instrument: String,
    pub action: Action,
    pub requested: u64,
    pub filled: u64,
    pub price: Decimal,
}

/// Everything a finished backtest produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub instruments: Vec<String>,
    pub initial_cash: Decimal,
    pub final_value: Decimal,
    pub metrics: PerformanceMetrics,
    pub history: ValuationHistory,
    pub trades: Vec<TradeRecord>,
    pub final_portfolio: PortfolioSnapshot,
}

impl BacktestReport {
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), BacktestError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        tracing::info!(path = %path.as_ref().display(), "backtest report saved");
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, BacktestError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
