use crate::tally::Tally;
use core_types::{Action, Decision, Direction, RiskLimit, Signal};
use executor::{ExecutionSimulator, Portfolio};
use executor::portfolio::whole_shares;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Resolves aggregated signals into one sized decision per instrument.
///
/// Instruments are decided in ascending identifier order. Each decision is sized
/// against a projection of the portfolio with the earlier decisions of the same
/// cycle already applied, so instruments earlier in the order get first claim on
/// shared cash.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    simulator: ExecutionSimulator,
}

impl DecisionEngine {
    pub fn new(allow_shorting: bool) -> Self {
        Self {
            simulator: ExecutionSimulator::new(allow_shorting),
        }
    }

    /// One decision per instrument that has both a risk limit and a positive price.
    ///
    /// Instruments missing either are left out of the result entirely. Instruments
    /// without signals vote neutral and hold.
    pub fn decide(
        &self,
        signals: &BTreeMap<String, Vec<Signal>>,
        limits: &BTreeMap<String, RiskLimit>,
        portfolio: &Portfolio,
        prices: &BTreeMap<String, Decimal>,
    ) -> BTreeMap<String, Decision> {
        let mut projected = portfolio.clone();
        let mut decisions = BTreeMap::new();

        for (instrument, limit) in limits {
            let Some(&price) = prices.get(instrument).filter(|p| **p > Decimal::ZERO) else {
                tracing::debug!(%instrument, "no usable price, skipping decision");
                continue;
            };

            let tally = Tally::of(signals.get(instrument).map(Vec::as_slice).unwrap_or(&[]));
            let decision = self.resolve(instrument, &tally, limit, &projected, price);

            if !decision.is_noop() {
                if let Err(e) = self.simulator.execute(&mut projected, &decision, price) {
                    tracing::warn!(%instrument, error = %e, "could not project decision");
                }
            }
            tracing::debug!(
                %instrument,
                action = %decision.action,
                quantity = decision.quantity,
                rationale = %decision.rationale,
                "decided"
            );
            decisions.insert(instrument.clone(), decision);
        }

        decisions
    }

    fn resolve(
        &self,
        instrument: &str,
        tally: &Tally,
        limit: &RiskLimit,
        projected: &Portfolio,
        price: Decimal,
    ) -> Decision {
        let long = projected.long_shares(instrument);
        let short = projected.short_shares(instrument);

        let (action, quantity) = match tally.direction() {
            Direction::Neutral => (Action::Hold, 0),
            Direction::Bullish if short > 0 => (
                Action::Cover,
                short.min(projected.max_affordable_cover(instrument, price)),
            ),
            Direction::Bullish => {
                let headroom = headroom(limit.max_position_value, long, price);
                let budget = headroom.min(projected.cash());
                (Action::Buy, whole_shares(budget, price))
            }
            Direction::Bearish if long > 0 => (Action::Sell, long),
            Direction::Bearish if self.simulator.allow_shorting() => {
                let headroom = headroom(limit.max_short_value, short, price);
                let quantity = whole_shares(headroom, price).min(projected.max_affordable_short(price));
                (Action::Short, quantity)
            }
            Direction::Bearish => (Action::Hold, 0),
        };

        if action == Action::Hold || quantity == 0 {
            return Decision::hold(instrument, tally.summary());
        }

        Decision {
            instrument: instrument.to_string(),
            action,
            quantity,
            confidence: tally.confidence(),
            rationale: tally.summary(),
        }
    }
}

/// What is left of `cap` after `held` shares at `price`; zero once the cap is used up.
fn headroom(cap: Decimal, held: u64, price: Decimal) -> Decimal {
    Decimal::from(held)
        .checked_mul(price)
        .map_or(Decimal::ZERO, |value| (cap - value).max(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn signal(source: &str, instrument: &str, direction: Direction, confidence: Decimal) -> Signal {
        Signal::new(source, instrument, direction, confidence, "").unwrap()
    }

    fn limit(instrument: &str, max_long: Decimal, max_short: Decimal, cash: Decimal) -> RiskLimit {
        RiskLimit {
            instrument: instrument.to_string(),
            max_position_value: max_long,
            max_short_value: max_short,
            available_cash_snapshot: cash,
        }
    }

    fn one(instrument: &str, signals: Vec<Signal>) -> BTreeMap<String, Vec<Signal>> {
        BTreeMap::from([(instrument.to_string(), signals)])
    }

    #[test]
    fn unanimous_bullish_buys_up_to_position_limit() {
        let engine = DecisionEngine::new(true);
        let portfolio = Portfolio::new(dec!(100000), dec!(0.5)).unwrap();
        let signals = one(
            "AAPL",
            vec![
                signal("a", "AAPL", Direction::Bullish, dec!(0.9)),
                signal("b", "AAPL", Direction::Bullish, dec!(0.8)),
                signal("c", "AAPL", Direction::Bullish, dec!(0.7)),
            ],
        );
        let limits = BTreeMap::from([(
            "AAPL".to_string(),
            limit("AAPL", dec!(20000), dec!(20000), dec!(100000)),
        )]);
        let prices = BTreeMap::from([("AAPL".to_string(), dec!(150.25))]);

        let decisions = engine.decide(&signals, &limits, &portfolio, &prices);

        let decision = &decisions["AAPL"];
        assert_eq!(decision.action, Action::Buy);
        assert_eq!(decision.quantity, 133);
        assert_eq!(decision.confidence, dec!(1));
        assert!(Decimal::from(decision.quantity) * dec!(150.25) <= portfolio.cash());
    }

    #[test]
    fn decisions_are_deterministic() {
        let engine = DecisionEngine::new(true);
        let portfolio = Portfolio::new(dec!(50000), dec!(0.5)).unwrap();
        let signals = BTreeMap::from([
            (
                "AAPL".to_string(),
                vec![signal("a", "AAPL", Direction::Bullish, dec!(0.4))],
            ),
            (
                "MSFT".to_string(),
                vec![signal("a", "MSFT", Direction::Bearish, dec!(0.7))],
            ),
        ]);
        let limits = BTreeMap::from([
            ("AAPL".to_string(), limit("AAPL", dec!(10000), dec!(10000), dec!(50000))),
            ("MSFT".to_string(), limit("MSFT", dec!(10000), dec!(10000), dec!(50000))),
        ]);
        let prices = BTreeMap::from([
            ("AAPL".to_string(), dec!(101.5)),
            ("MSFT".to_string(), dec!(310)),
        ]);

        let first = engine.decide(&signals, &limits, &portfolio, &prices);
        let second = engine.decide(&signals, &limits, &portfolio, &prices);
        assert_eq!(first, second);
        assert_eq!(first["MSFT"].action, Action::Short);
        assert_eq!(first["MSFT"].quantity, 32);
    }

    #[test]
    fn bullish_with_short_held_covers_first() {
        let engine = DecisionEngine::new(true);
        let sim = ExecutionSimulator::new(true);
        let mut portfolio = Portfolio::new(dec!(10000), dec!(0.5)).unwrap();
        sim.execute(
            &mut portfolio,
            &Decision {
                instrument: "AAPL".to_string(),
                action: Action::Short,
                quantity: 20,
                confidence: dec!(1),
                rationale: String::new(),
            },
            dec!(50),
        )
        .unwrap();

        let signals = one("AAPL", vec![signal("a", "AAPL", Direction::Bullish, dec!(0.5))]);
        let limits = BTreeMap::from([(
            "AAPL".to_string(),
            limit("AAPL", dec!(2000), dec!(2000), portfolio.cash()),
        )]);
        let prices = BTreeMap::from([("AAPL".to_string(), dec!(45))]);

        let decisions = engine.decide(&signals, &limits, &portfolio, &prices);
        assert_eq!(decisions["AAPL"].action, Action::Cover);
        assert_eq!(decisions["AAPL"].quantity, 20);
    }

    #[test]
    fn bearish_with_long_held_sells_everything() {
        let engine = DecisionEngine::new(false);
        let sim = ExecutionSimulator::new(false);
        let mut portfolio = Portfolio::new(dec!(10000), dec!(0.5)).unwrap();
        sim.execute(
            &mut portfolio,
            &Decision {
                instrument: "AAPL".to_string(),
                action: Action::Buy,
                quantity: 12,
                confidence: dec!(1),
                rationale: String::new(),
            },
            dec!(100),
        )
        .unwrap();

        let signals = one(
            "AAPL",
            vec![
                signal("a", "AAPL", Direction::Bearish, dec!(0.9)),
                signal("b", "AAPL", Direction::Bullish, dec!(0.2)),
            ],
        );
        let limits = BTreeMap::from([(
            "AAPL".to_string(),
            limit("AAPL", dec!(2000), dec!(2000), portfolio.cash()),
        )]);
        let prices = BTreeMap::from([("AAPL".to_string(), dec!(95))]);

        let decision = &engine.decide(&signals, &limits, &portfolio, &prices)["AAPL"];
        assert_eq!(decision.action, Action::Sell);
        assert_eq!(decision.quantity, 12);
    }

    #[test]
    fn bearish_without_shorting_holds() {
        let engine = DecisionEngine::new(false);
        let portfolio = Portfolio::new(dec!(10000), dec!(0.5)).unwrap();
        let signals = one("AAPL", vec![signal("a", "AAPL", Direction::Bearish, dec!(0.9))]);
        let limits = BTreeMap::from([(
            "AAPL".to_string(),
            limit("AAPL", dec!(2000), dec!(2000), dec!(10000)),
        )]);
        let prices = BTreeMap::from([("AAPL".to_string(), dec!(95))]);

        let decision = &engine.decide(&signals, &limits, &portfolio, &prices)["AAPL"];
        assert_eq!(decision.action, Action::Hold);
        assert_eq!(decision.quantity, 0);
    }

    #[test]
    fn tied_vote_holds() {
        let engine = DecisionEngine::new(true);
        let portfolio = Portfolio::new(dec!(10000), dec!(0.5)).unwrap();
        let signals = one(
            "AAPL",
            vec![
                signal("a", "AAPL", Direction::Bullish, dec!(0.5)),
                signal("b", "AAPL", Direction::Bearish, dec!(0.5)),
            ],
        );
        let limits = BTreeMap::from([(
            "AAPL".to_string(),
            limit("AAPL", dec!(2000), dec!(2000), dec!(10000)),
        )]);
        let prices = BTreeMap::from([("AAPL".to_string(), dec!(95))]);

        let decision = &engine.decide(&signals, &limits, &portfolio, &prices)["AAPL"];
        assert_eq!(decision.action, Action::Hold);
    }

    #[test]
    fn missing_price_or_limit_yields_no_decision() {
        let engine = DecisionEngine::new(true);
        let portfolio = Portfolio::new(dec!(10000), dec!(0.5)).unwrap();
        let signals = BTreeMap::from([
            ("AAPL".to_string(), vec![signal("a", "AAPL", Direction::Bullish, dec!(0.5))]),
            ("MSFT".to_string(), vec![signal("a", "MSFT", Direction::Bullish, dec!(0.5))]),
        ]);
        let limits = BTreeMap::from([(
            "AAPL".to_string(),
            limit("AAPL", dec!(2000), dec!(2000), dec!(10000)),
        )]);

        let decisions = engine.decide(&signals, &limits, &portfolio, &BTreeMap::new());
        assert!(decisions.is_empty());
    }

    #[test]
    fn earlier_instruments_get_first_claim_on_cash() {
        let engine = DecisionEngine::new(true);
        let portfolio = Portfolio::new(dec!(1000), dec!(0.5)).unwrap();
        let bullish = |i: &str| vec![signal("a", i, Direction::Bullish, dec!(1))];
        let signals = BTreeMap::from([
            ("AAA".to_string(), bullish("AAA")),
            ("BBB".to_string(), bullish("BBB")),
        ]);
        // Both limits allow the whole account; only the first can have it.
        let limits = BTreeMap::from([
            ("AAA".to_string(), limit("AAA", dec!(1000), dec!(1000), dec!(1000))),
            ("BBB".to_string(), limit("BBB", dec!(1000), dec!(1000), dec!(1000))),
        ]);
        let prices = BTreeMap::from([
            ("AAA".to_string(), dec!(300)),
            ("BBB".to_string(), dec!(100)),
        ]);

        let decisions = engine.decide(&signals, &limits, &portfolio, &prices);

        assert_eq!(decisions["AAA"].quantity, 3);
        assert_eq!(decisions["BBB"].quantity, 1);
        let spent = dec!(3) * dec!(300) + dec!(1) * dec!(100);
        assert!(spent <= portfolio.cash());
    }
}
