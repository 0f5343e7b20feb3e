use crate::enums::{Action, Direction};
use crate::error::CoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A directional opinion on one instrument from one signal source.
///
/// Signals are immutable once built; the constructor is the only place the
/// confidence range is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    source_id: String,
    instrument: String,
    direction: Direction,
    confidence: Decimal,
    rationale: String,
}

impl Signal {
    /// Builds a signal, rejecting a confidence outside `[0, 1]`.
    pub fn new(
        source_id: impl Into<String>,
        instrument: impl Into<String>,
        direction: Direction,
        confidence: Decimal,
        rationale: impl Into<String>,
    ) -> Result<Self, CoreError> {
        if confidence < Decimal::ZERO || confidence > Decimal::ONE {
            return Err(CoreError::InvalidInput(
                "confidence".to_string(),
                format!("{} is outside [0, 1]", confidence),
            ));
        }
        Ok(Self {
            source_id: source_id.into(),
            instrument: instrument.into(),
            direction,
            confidence,
            rationale: rationale.into(),
        })
    }

    /// The zero-confidence neutral signal substituted when a source fails.
    pub fn neutral(
        source_id: impl Into<String>,
        instrument: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            instrument: instrument.into(),
            direction: Direction::Neutral,
            confidence: Decimal::ZERO,
            rationale: rationale.into(),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn confidence(&self) -> Decimal {
        self.confidence
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    /// Signed, confidence-weighted contribution to an aggregate score.
    pub fn weighted_vote(&self) -> Decimal {
        Decimal::from(self.direction.sign()) * self.confidence
    }
}

/// The exposure bounds the risk manager permits for one instrument in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimit {
    pub instrument: String,
    /// Largest long market value allowed, already clipped to available cash.
    pub max_position_value: Decimal,
    /// Largest short notional allowed.
    pub max_short_value: Decimal,
    pub available_cash_snapshot: Decimal,
}

/// The engine's resolved action for one instrument for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub instrument: String,
    pub action: Action,
    pub quantity: u64,
    pub confidence: Decimal,
    pub rationale: String,
}

impl Decision {
    pub fn hold(instrument: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            action: Action::Hold,
            quantity: 0,
            confidence: Decimal::ZERO,
            rationale: rationale.into(),
        }
    }

    /// True when executing this decision cannot change the portfolio.
    pub fn is_noop(&self) -> bool {
        self.action == Action::Hold || self.quantity == 0
    }
}

/// A single mark of total portfolio value at the close of a trading date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationPoint {
    pub date: NaiveDate,
    pub total_value: Decimal,
}
