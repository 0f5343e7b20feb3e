use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Analyst error: {0}")]
    Analyst(#[from] analysts::AnalystError),

    #[error("Market data error: {0}")]
    MarketData(#[from] market_data::MarketDataError),

    #[error("Risk management error: {0}")]
    Risk(#[from] risk::RiskError),

    #[error("Portfolio state error: {0}")]
    Portfolio(#[from] executor::ExecutorError),

    #[error("Analytics error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),
}
