use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Portfolio parameters are invalid: {0}")]
    InvalidParameters(String),

    #[error("Execution price for {instrument} must be positive, got {price}")]
    InvalidPrice { instrument: String, price: Decimal },

    #[error("Missing market price for symbol: {0}")]
    MissingPrice(String),

    #[error("Portfolio value overflows at the given prices")]
    ValueOverflow,

    #[error("Order not found: {0}")]
    OrderNotFound(String),
}
