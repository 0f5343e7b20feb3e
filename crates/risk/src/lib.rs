//! # Council Risk Crate
//!
//! Turns the current portfolio into per-instrument exposure bounds for one cycle.
//! Limits are recomputed every cycle from scratch and never persisted.

pub mod error;
pub mod position_limit;

pub use error::RiskError;
pub use position_limit::PositionLimitRiskManager;

use core_types::RiskLimit;
use executor::Portfolio;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Computes the exposure a decision may take on for each instrument.
///
/// Implementations are pure: the same portfolio and prices always produce the
/// same limits.
pub trait RiskManager: Send + Sync {
    /// Returns one limit per instrument in `instruments` that has a price in `prices`.
    ///
    /// `prices` must also cover every open position so the portfolio can be valued.
    fn compute_limits(
        &self,
        portfolio: &Portfolio,
        instruments: &[String],
        prices: &BTreeMap<String, Decimal>,
    ) -> Result<BTreeMap<String, RiskLimit>, RiskError>;
}
