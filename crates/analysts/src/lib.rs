//! # Council Analysts
//!
//! This crate defines the contract every signal source satisfies and the registry
//! the orchestrator consults each cycle. It also ships two simple technical
//! analysts so a registry can be assembled from configuration alone.
//!
//! ## Architectural Principles
//!
//! - **Black boxes:** The orchestrator knows an analyst only through `SignalSource`.
//!   Whether it reads moving averages or calls a language model is invisible to it.
//! - **Extensibility:** Adding an analyst means implementing `SignalSource` and
//!   registering it, either through `AnalystRegistry::register` or the `factory`.

pub mod error;
pub mod factory;
pub mod momentum;
pub mod registry;
pub mod trend;

pub use error::AnalystError;
pub use factory::{create_analyst, registry_from_config};
pub use momentum::MomentumAnalyst;
pub use registry::AnalystRegistry;
pub use trend::TrendAnalyst;

use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::Signal;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// The contract every analyst satisfies.
///
/// `produce` may be slow or fail. The orchestrator bounds each call with a timeout
/// and substitutes a neutral signal on failure, so implementations should return
/// errors rather than guess.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// The unique name this source is registered under.
    fn id(&self) -> &str;

    async fn produce(&self, instrument: &str, as_of: NaiveDate) -> Result<Signal, AnalystError>;
}

/// Converts closes into the `f64`s the `ta` indicators expect.
pub(crate) fn closes_f64(closes: impl IntoIterator<Item = Decimal>) -> Result<Vec<f64>, AnalystError> {
    closes
        .into_iter()
        .map(|c| {
            c.to_f64()
                .ok_or_else(|| AnalystError::IndicatorError(format!("close {} is not representable", c)))
        })
        .collect()
}

/// Maps an indicator strength onto `[0, 1]`, saturating at `full_at`.
pub(crate) fn confidence_from(strength: f64, full_at: f64) -> Decimal {
    let raw = if full_at > 0.0 { strength.abs() / full_at } else { 1.0 };
    Decimal::from_f64(raw.min(1.0))
        .map(|d| d.round_dp(4))
        .unwrap_or(Decimal::ZERO)
}
