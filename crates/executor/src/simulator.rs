use crate::error::ExecutorError;
use crate::portfolio::{Portfolio, Position, largest_fitting};
use core_types::{Action, Decision};
use rust_decimal::Decimal;

/// The "virtual exchange" for backtesting.
///
/// Applies decisions to a portfolio at a given price. Insufficient cash, margin or
/// shares never produce an error: the order degrades to the largest whole-share
/// fill that keeps `cash >= 0`, and the rest of the requested quantity is dropped.
/// Fills are also clamped so that no share count or amount overflows.
#[derive(Debug, Clone)]
pub struct ExecutionSimulator {
    allow_shorting: bool,
}

impl ExecutionSimulator {
    pub fn new(allow_shorting: bool) -> Self {
        Self { allow_shorting }
    }

    pub fn allow_shorting(&self) -> bool {
        self.allow_shorting
    }

    /// Executes `decision` against `portfolio` at `price` and returns the filled quantity.
    ///
    /// The only error is a non-positive price, which callers treat as a data gap.
    pub fn execute(
        &self,
        portfolio: &mut Portfolio,
        decision: &Decision,
        price: Decimal,
    ) -> Result<u64, ExecutorError> {
        if decision.is_noop() {
            return Ok(0);
        }
        if price <= Decimal::ZERO {
            return Err(ExecutorError::InvalidPrice {
                instrument: decision.instrument.clone(),
                price,
            });
        }

        let instrument = decision.instrument.as_str();
        let requested = decision.quantity;
        let filled = match decision.action {
            Action::Buy => self.buy(portfolio, instrument, requested, price),
            Action::Sell => self.sell(portfolio, instrument, requested, price),
            Action::Short => self.short(portfolio, instrument, requested, price),
            Action::Cover => self.cover(portfolio, instrument, requested, price),
            Action::Hold => 0,
        };

        if filled < requested {
            tracing::debug!(
                instrument,
                action = %decision.action,
                requested,
                filled,
                "partial fill, remainder dropped"
            );
        } else {
            tracing::debug!(instrument, action = %decision.action, filled, %price, "filled");
        }

        Ok(filled)
    }

    fn buy(&self, portfolio: &mut Portfolio, instrument: &str, requested: u64, price: Decimal) -> u64 {
        let bound = requested.min(portfolio.max_affordable_buy(price));
        let position = portfolio.position_or_flat(instrument);
        let cash = portfolio.cash;
        let fill = largest_fitting(bound, |q| try_buy(&position, cash, q, price).is_some());
        self.commit(portfolio, fill, try_buy(&position, cash, fill, price))
    }

    fn sell(&self, portfolio: &mut Portfolio, instrument: &str, requested: u64, price: Decimal) -> u64 {
        let bound = requested.min(portfolio.long_shares(instrument));
        let position = portfolio.position_or_flat(instrument);
        let cash = portfolio.cash;
        let fill = largest_fitting(bound, |q| try_sell(&position, cash, q, price).is_some());
        self.commit(portfolio, fill, try_sell(&position, cash, fill, price))
    }

    fn short(&self, portfolio: &mut Portfolio, instrument: &str, requested: u64, price: Decimal) -> u64 {
        if !self.allow_shorting {
            tracing::debug!(instrument, "shorting disabled, order rejected");
            return 0;
        }
        let bound = requested.min(portfolio.max_affordable_short(price));
        let position = portfolio.position_or_flat(instrument);
        let account = Account::of(portfolio);
        let fill = largest_fitting(bound, |q| try_short(&position, &account, q, price).is_some());
        self.commit(portfolio, fill, try_short(&position, &account, fill, price))
    }

    /// Partial covers release margin pro rata and leave the short cost basis as is.
    fn cover(&self, portfolio: &mut Portfolio, instrument: &str, requested: u64, price: Decimal) -> u64 {
        let bound = requested.min(portfolio.max_affordable_cover(instrument, price));
        let position = portfolio.position_or_flat(instrument);
        let cash = portfolio.cash;
        let fill = largest_fitting(bound, |q| try_cover(&position, cash, q, price).is_some());
        self.commit(portfolio, fill, try_cover(&position, cash, fill, price))
    }

    fn commit(&self, portfolio: &mut Portfolio, fill: u64, outcome: Option<(Position, Decimal)>) -> u64 {
        match outcome {
            Some((position, cash)) if fill > 0 => {
                portfolio.replace_position(position, cash);
                fill
            }
            _ => 0,
        }
    }
}

/// Cash and account margin as seen by a short.
struct Account {
    cash: Decimal,
    margin_used: Decimal,
    margin_requirement: Decimal,
}

impl Account {
    fn of(portfolio: &Portfolio) -> Self {
        Self {
            cash: portfolio.cash,
            margin_used: portfolio.margin_used,
            margin_requirement: portfolio.margin_requirement,
        }
    }
}

// Each `try_*` returns the position and cash after filling `q` shares, or `None`
// when any amount would overflow. Callers bound `q` by cash and holdings first.

fn try_buy(position: &Position, cash: Decimal, q: u64, price: Decimal) -> Option<(Position, Decimal)> {
    if q == 0 {
        return Some((position.clone(), cash));
    }
    let cost = Decimal::from(q).checked_mul(price)?;
    let mut next = position.clone();
    next.long_shares = position.long_shares.checked_add(q)?;
    next.long_cost_basis =
        average_in(position.long_cost_basis, position.long_shares, cost, next.long_shares, price)?;
    Some((next, cash.checked_sub(cost)?))
}

fn try_sell(position: &Position, cash: Decimal, q: u64, price: Decimal) -> Option<(Position, Decimal)> {
    if q == 0 {
        return Some((position.clone(), cash));
    }
    let proceeds = Decimal::from(q).checked_mul(price)?;
    let gain = (price - position.long_cost_basis).checked_mul(Decimal::from(q))?;
    let mut next = position.clone();
    next.realized_gains = position.realized_gains.checked_add(gain)?;
    next.long_shares = position.long_shares.checked_sub(q)?;
    if next.long_shares == 0 {
        next.long_cost_basis = Decimal::ZERO;
    }
    Some((next, cash.checked_add(proceeds)?))
}

fn try_short(position: &Position, account: &Account, q: u64, price: Decimal) -> Option<(Position, Decimal)> {
    if q == 0 {
        return Some((position.clone(), account.cash));
    }
    let proceeds = Decimal::from(q).checked_mul(price)?;
    let margin = proceeds.checked_mul(account.margin_requirement)?;
    account.margin_used.checked_add(margin)?;

    let mut next = position.clone();
    next.short_shares = position.short_shares.checked_add(q)?;
    next.short_cost_basis =
        average_in(position.short_cost_basis, position.short_shares, proceeds, next.short_shares, price)?;
    next.short_margin_used = position.short_margin_used.checked_add(margin)?;
    Some((next, account.cash.checked_add(proceeds - margin)?))
}

fn try_cover(position: &Position, cash: Decimal, q: u64, price: Decimal) -> Option<(Position, Decimal)> {
    if q == 0 {
        return Some((position.clone(), cash));
    }
    let release = Portfolio::margin_release(position, q)?;
    let cost = Decimal::from(q).checked_mul(price)?;
    let gain = (position.short_cost_basis - price).checked_mul(Decimal::from(q))?;
    let mut next = position.clone();
    next.realized_gains = position.realized_gains.checked_add(gain)?;
    next.short_margin_used = position.short_margin_used - release;
    next.short_shares = position.short_shares.checked_sub(q)?;
    if next.short_shares == 0 {
        next.short_cost_basis = Decimal::ZERO;
        next.short_margin_used = Decimal::ZERO;
    }
    Some((next, cash.checked_add(release)?.checked_sub(cost)?))
}

/// Weighted-average basis after adding `added` worth of shares to `held`.
///
/// The whole side must also stay representable at `price`.
fn average_in(basis: Decimal, held: u64, added: Decimal, total: u64, price: Decimal) -> Option<Decimal> {
    Decimal::from(total).checked_mul(price)?;
    let open_value = basis.checked_mul(Decimal::from(held))?.checked_add(added)?;
    open_value.checked_div(Decimal::from(total))
}
