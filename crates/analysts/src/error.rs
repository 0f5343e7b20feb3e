use core_types::CoreError;
use market_data::MarketDataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalystError {
    #[error("Analyst received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("An error occurred during indicator calculation: {0}")]
    IndicatorError(String),

    #[error("Market data unavailable: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Analyst built an invalid signal: {0}")]
    InvalidSignal(#[from] CoreError),

    #[error("An analyst named '{0}' is already registered")]
    DuplicateSource(String),
}
