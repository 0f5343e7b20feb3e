use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("No price for {instrument} on {date}")]
    PriceUnavailable { instrument: String, date: NaiveDate },

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Price data is invalid: {0}")]
    InvalidData(String),

    #[error("Failed to read price file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse price file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Primary provider failed ({primary}) and fallback failed ({fallback})")]
    AllProvidersFailed { primary: String, fallback: String },
}
