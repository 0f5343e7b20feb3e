use crate::error::ExecutorError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MARGIN_DP: u32 = 10;

/// Long and short holdings of one instrument.
///
/// Cost bases are the weighted-average entry price of the shares currently open on
/// that side and drop back to zero when the side is flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub(crate) instrument: String,
    pub(crate) long_shares: u64,
    pub(crate) short_shares: u64,
    pub(crate) long_cost_basis: Decimal,
    pub(crate) short_cost_basis: Decimal,
    /// Collateral reserved against the open short shares.
    pub(crate) short_margin_used: Decimal,
    pub(crate) realized_gains: Decimal,
}

impl Position {
    pub(crate) fn flat(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            long_shares: 0,
            short_shares: 0,
            long_cost_basis: Decimal::ZERO,
            short_cost_basis: Decimal::ZERO,
            short_margin_used: Decimal::ZERO,
            realized_gains: Decimal::ZERO,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn long_shares(&self) -> u64 {
        self.long_shares
    }

    pub fn short_shares(&self) -> u64 {
        self.short_shares
    }

    pub fn long_cost_basis(&self) -> Decimal {
        self.long_cost_basis
    }

    pub fn short_cost_basis(&self) -> Decimal {
        self.short_cost_basis
    }

    pub fn short_margin_used(&self) -> Decimal {
        self.short_margin_used
    }

    pub fn realized_gains(&self) -> Decimal {
        self.realized_gains
    }

    pub fn is_flat(&self) -> bool {
        self.long_shares == 0 && self.short_shares == 0
    }
}

/// Manages the state of a trading account: cash, margin and positions.
///
/// The only way to change a portfolio is `ExecutionSimulator::execute`; every
/// other component gets read access.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub(crate) cash: Decimal,
    pub(crate) margin_used: Decimal,
    pub(crate) margin_requirement: Decimal,
    pub(crate) positions: BTreeMap<String, Position>,
}

/// A serializable copy of the portfolio at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub cash: Decimal,
    pub margin_used: Decimal,
    pub margin_requirement: Decimal,
    pub positions: Vec<Position>,
}

impl Portfolio {
    /// Creates a new `Portfolio` with a given amount of starting cash and no positions.
    pub fn new(initial_cash: Decimal, margin_requirement: Decimal) -> Result<Self, ExecutorError> {
        if initial_cash < Decimal::ZERO {
            return Err(ExecutorError::InvalidParameters(format!(
                "initial cash must not be negative, got {}",
                initial_cash
            )));
        }
        if margin_requirement < Decimal::ZERO || margin_requirement > Decimal::ONE {
            return Err(ExecutorError::InvalidParameters(format!(
                "margin requirement must be within [0, 1], got {}",
                margin_requirement
            )));
        }
        Ok(Self {
            cash: initial_cash,
            margin_used: Decimal::ZERO,
            margin_requirement,
            positions: BTreeMap::new(),
        })
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn margin_used(&self) -> Decimal {
        self.margin_used
    }

    pub fn margin_requirement(&self) -> Decimal {
        self.margin_requirement
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    pub fn position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    pub fn long_shares(&self, instrument: &str) -> u64 {
        self.position(instrument).map_or(0, |p| p.long_shares)
    }

    pub fn short_shares(&self, instrument: &str) -> u64 {
        self.position(instrument).map_or(0, |p| p.short_shares)
    }

    /// Realized gains summed across every instrument ever traded.
    pub fn realized_gains(&self) -> Decimal {
        self.positions.values().map(|p| p.realized_gains).sum()
    }

    /// Total value at the given prices:
    /// `cash + Σ long·price − Σ short·price + margin_used`.
    ///
    /// The reserved short collateral is added back because it still belongs to the
    /// account. Every open position needs a price.
    pub fn total_value(&self, prices: &BTreeMap<String, Decimal>) -> Result<Decimal, ExecutorError> {
        let mut total = self
            .cash
            .checked_add(self.margin_used)
            .ok_or(ExecutorError::ValueOverflow)?;

        for (instrument, position) in &self.positions {
            if position.is_flat() {
                continue;
            }
            let price = prices
                .get(instrument)
                .ok_or_else(|| ExecutorError::MissingPrice(instrument.clone()))?;
            let long = Decimal::from(position.long_shares).checked_mul(*price);
            let short = Decimal::from(position.short_shares).checked_mul(*price);
            total = long
                .zip(short)
                .and_then(|(long, short)| total.checked_add(long)?.checked_sub(short))
                .ok_or(ExecutorError::ValueOverflow)?;
        }

        Ok(total)
    }

    /// Each instrument's share of gross market exposure (long plus short value).
    ///
    /// Returns an empty map when nothing is open.
    pub fn weights(
        &self,
        prices: &BTreeMap<String, Decimal>,
    ) -> Result<BTreeMap<String, Decimal>, ExecutorError> {
        let mut exposures = BTreeMap::new();
        for (instrument, position) in &self.positions {
            if position.is_flat() {
                continue;
            }
            let price = prices
                .get(instrument)
                .ok_or_else(|| ExecutorError::MissingPrice(instrument.clone()))?;
            let gross = (Decimal::from(position.long_shares) + Decimal::from(position.short_shares))
                .checked_mul(*price)
                .ok_or(ExecutorError::ValueOverflow)?;
            exposures.insert(instrument.clone(), gross);
        }

        let gross_total = exposures
            .values()
            .try_fold(Decimal::ZERO, |sum, gross| sum.checked_add(*gross))
            .ok_or(ExecutorError::ValueOverflow)?;
        if gross_total.is_zero() {
            return Ok(BTreeMap::new());
        }
        Ok(exposures
            .into_iter()
            .map(|(instrument, gross)| (instrument, gross / gross_total))
            .collect())
    }

    /// The most whole shares that can be bought at `price` with current cash.
    pub fn max_affordable_buy(&self, price: Decimal) -> u64 {
        whole_shares(self.cash, price)
    }

    /// The most whole shares that can be shorted at `price` under the margin requirement.
    ///
    /// With a zero margin requirement no collateral is needed and the bound is `u64::MAX`.
    pub fn max_affordable_short(&self, price: Decimal) -> u64 {
        if self.margin_requirement.is_zero() {
            return u64::MAX;
        }
        whole_shares(self.cash, price * self.margin_requirement)
    }

    /// The most short shares of `instrument` that can be bought back at `price`
    /// without cash going negative, counting the collateral the cover releases.
    pub fn max_affordable_cover(&self, instrument: &str, price: Decimal) -> u64 {
        let Some(position) = self.position(instrument) else {
            return 0;
        };
        let held = position.short_shares;
        if held == 0 {
            return 0;
        }

        let margin_per_share = position.short_margin_used / Decimal::from(held);
        let net_cost_per_share = price - margin_per_share;
        let bound = if net_cost_per_share <= Decimal::ZERO {
            held
        } else {
            whole_shares(self.cash, net_cost_per_share).min(held)
        };

        // Step down past any rounding in the proportional margin release.
        largest_fitting(bound, |fill| {
            self.cash_after_cover(position, fill, price)
                .is_some_and(|cash| cash >= Decimal::ZERO)
        })
    }

    /// Collateral returned when `fill` of the position's short shares are covered.
    ///
    /// A partial release is rounded to 10 places so that moving it between margin
    /// and cash stays exact. `None` if the proportion overflows.
    pub(crate) fn margin_release(position: &Position, fill: u64) -> Option<Decimal> {
        if fill >= position.short_shares {
            return Some(position.short_margin_used);
        }
        let released = position
            .short_margin_used
            .checked_mul(Decimal::from(fill))?
            .checked_div(Decimal::from(position.short_shares))?;
        Some(released.round_dp(MARGIN_DP))
    }

    fn cash_after_cover(&self, position: &Position, fill: u64, price: Decimal) -> Option<Decimal> {
        self.cash
            .checked_add(Self::margin_release(position, fill)?)?
            .checked_sub(Decimal::from(fill).checked_mul(price)?)
    }

    /// A copy of the position in `instrument`, flat if none is open.
    pub(crate) fn position_or_flat(&self, instrument: &str) -> Position {
        self.position(instrument)
            .cloned()
            .unwrap_or_else(|| Position::flat(instrument))
    }

    /// Stores the post-trade position and cash of a fill.
    pub(crate) fn replace_position(&mut self, position: Position, cash: Decimal) {
        self.positions.insert(position.instrument.clone(), position);
        self.cash = cash;
        self.sync_margin_used();
    }

    /// Re-derives the account-level margin from the per-position reservations.
    pub(crate) fn sync_margin_used(&mut self) {
        self.margin_used = self.positions.values().map(|p| p.short_margin_used).sum();
    }

    pub fn snapshot(&self) -> PortfolioSnapshot {
        PortfolioSnapshot {
            cash: self.cash,
            margin_used: self.margin_used,
            margin_requirement: self.margin_requirement,
            positions: self.positions.values().cloned().collect(),
        }
    }
}

/// The largest `q <= bound` for which `fits(q)` holds.
///
/// `fits` must be monotone: true up to some quantity and false above it. `fits(0)`
/// is assumed to hold.
pub(crate) fn largest_fitting(bound: u64, fits: impl Fn(u64) -> bool) -> u64 {
    if fits(bound) {
        return bound;
    }
    let (mut lo, mut hi) = (0u64, bound);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// How many whole shares `value` pays for at `per_share`.
///
/// A quotient too large for `Decimal` saturates at `u64::MAX`; a zero or negative
/// `per_share` pays for nothing.
pub fn whole_shares(value: Decimal, per_share: Decimal) -> u64 {
    if per_share <= Decimal::ZERO {
        return 0;
    }
    match value.checked_div(per_share) {
        Some(shares) => floor_shares(shares),
        None if value > Decimal::ZERO => u64::MAX,
        None => 0,
    }
}

/// Floors a non-negative share count to a whole number of shares.
fn floor_shares(value: Decimal) -> u64 {
    if value <= Decimal::ZERO {
        return 0;
    }
    value.floor().to_u64().unwrap_or(u64::MAX)
}
