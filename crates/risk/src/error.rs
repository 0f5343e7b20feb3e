use executor::ExecutorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Risk parameters from configuration are invalid: {0}")]
    InvalidParameters(String),

    #[error("Portfolio could not be valued: {0}")]
    Valuation(#[from] ExecutorError),
}
