use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Cycle failed: {0}")]
    Engine(#[from] engine::EngineError),

    #[error("Execution simulation error: {0}")]
    Executor(#[from] executor::ExecutorError),

    #[error("Analytics calculation error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Market data error: {0}")]
    MarketData(#[from] market_data::MarketDataError),

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),

    #[error("Backtest range is invalid: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("No trading dates between {start} and {end}")]
    DataUnavailable { start: NaiveDate, end: NaiveDate },

    #[error("Failed to read or write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode report: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<indicatif::style::TemplateError> for BacktestError {
    fn from(error: indicatif::style::TemplateError) -> Self {
        BacktestError::ProgressBarTemplate(error.to_string())
    }
}
