use core_types::{Direction, Signal};
use rust_decimal::Decimal;

/// The confidence-weighted vote over one instrument's signals.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Tally {
    pub score: Decimal,
    pub total_confidence: Decimal,
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

impl Tally {
    pub fn of(signals: &[Signal]) -> Self {
        let mut tally = Self::default();
        for signal in signals {
            tally.score += signal.weighted_vote();
            tally.total_confidence += signal.confidence();
            match signal.direction() {
                Direction::Bullish => tally.bullish += 1,
                Direction::Bearish => tally.bearish += 1,
                Direction::Neutral => tally.neutral += 1,
            }
        }
        tally
    }

    pub fn direction(&self) -> Direction {
        if self.score > Decimal::ZERO {
            Direction::Bullish
        } else if self.score < Decimal::ZERO {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    /// How one-sided the vote was, in `[0, 1]`.
    pub fn confidence(&self) -> Decimal {
        if self.total_confidence.is_zero() {
            Decimal::ZERO
        } else {
            self.score.abs() / self.total_confidence
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} bullish, {} bearish, {} neutral; score {}",
            self.bullish,
            self.bearish,
            self.neutral,
            self.score.normalize()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn signal(direction: Direction, confidence: Decimal) -> Signal {
        Signal::new("s", "AAPL", direction, confidence, "").unwrap()
    }

    #[test]
    fn opposing_votes_of_equal_weight_are_neutral() {
        let tally = Tally::of(&[
            signal(Direction::Bullish, dec!(0.6)),
            signal(Direction::Bearish, dec!(0.6)),
        ]);
        assert_eq!(tally.direction(), Direction::Neutral);
        assert_eq!(tally.confidence(), dec!(0));
    }

    #[test]
    fn no_signals_is_neutral_with_zero_confidence() {
        let tally = Tally::of(&[]);
        assert_eq!(tally.direction(), Direction::Neutral);
        assert_eq!(tally.confidence(), dec!(0));
    }

    #[test]
    fn confidence_is_share_of_net_score() {
        let tally = Tally::of(&[
            signal(Direction::Bullish, dec!(0.8)),
            signal(Direction::Bearish, dec!(0.2)),
        ]);
        assert_eq!(tally.score, dec!(0.6));
        assert_eq!(tally.confidence(), dec!(0.6));
        assert_eq!(tally.summary(), "1 bullish, 1 bearish, 0 neutral; score 0.6");
    }
}
