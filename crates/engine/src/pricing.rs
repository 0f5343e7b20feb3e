use chrono::NaiveDate;
use executor::Portfolio;
use futures::future::join_all;
use market_data::MarketData;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Fetches the price of every instrument on `date` concurrently.
///
/// Instruments without a positive price are left out and logged as a data gap; the
/// caller skips them for the rest of the cycle.
pub async fn fetch_prices(
    market_data: &dyn MarketData,
    instruments: &[String],
    date: NaiveDate,
) -> BTreeMap<String, Decimal> {
    let lookups = instruments
        .iter()
        .map(|instrument| async move { (instrument, market_data.price(instrument, date).await) });

    let mut prices = BTreeMap::new();
    for (instrument, result) in join_all(lookups).await {
        match result {
            Ok(price) if price > Decimal::ZERO => {
                prices.insert(instrument.clone(), price);
            }
            Ok(price) => {
                tracing::warn!(%instrument, %date, %price, "non-positive price, treating as data gap");
            }
            Err(e) => {
                tracing::warn!(%instrument, %date, error = %e, "data gap, instrument skipped this cycle");
            }
        }
    }
    prices
}

/// The last known price of every instrument seen so far.
///
/// Valuation uses these marks so a held instrument with a data gap is carried at
/// its most recent price instead of dropping out of the total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkBook {
    marks: BTreeMap<String, Decimal>,
}

impl MarkBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, prices: &BTreeMap<String, Decimal>) {
        for (instrument, price) in prices {
            self.marks.insert(instrument.clone(), *price);
        }
    }

    /// Gives every open position without a mark the most recent close on or before
    /// `as_of`, or its own cost basis when the instrument has no usable history.
    ///
    /// Positions can be opened before the book ever saw a price, as with a
    /// portfolio handed to a live engine; without a mark they could not be valued.
    pub async fn seed_open_positions(
        &mut self,
        market_data: &dyn MarketData,
        portfolio: &Portfolio,
        as_of: NaiveDate,
    ) {
        for (instrument, position) in portfolio.positions() {
            if position.is_flat() || self.marks.contains_key(instrument) {
                continue;
            }
            let last_close = match market_data.price_history(instrument, as_of, 1).await {
                Ok(bars) => bars.last().map(|bar| bar.close).filter(|p| *p > Decimal::ZERO),
                Err(e) => {
                    tracing::warn!(%instrument, %as_of, error = %e, "no price history for held instrument");
                    None
                }
            };
            let mark = match last_close {
                Some(close) => close,
                None if position.long_shares() > 0 => position.long_cost_basis(),
                None => position.short_cost_basis(),
            };
            tracing::warn!(%instrument, %as_of, %mark, from_history = last_close.is_some(), "seeded mark for held instrument");
            self.marks.insert(instrument.clone(), mark);
        }
    }

    pub fn marks(&self) -> &BTreeMap<String, Decimal> {
        &self.marks
    }

    pub fn get(&self, instrument: &str) -> Option<Decimal> {
        self.marks.get(instrument).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{Action, Decision};
    use market_data::InMemoryMarketData;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn gaps_are_skipped_and_marks_carry_forward() {
        let d1 = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let data = InMemoryMarketData::new()
            .with_closes("AAPL", &[(d1, dec!(190)), (d2, dec!(192))])
            .unwrap()
            .with_closes("MSFT", &[(d1, dec!(410))])
            .unwrap();
        let instruments = vec!["AAPL".to_string(), "MSFT".to_string()];
        let mut book = MarkBook::new();

        book.update(&fetch_prices(&data, &instruments, d1).await);
        let day_two = fetch_prices(&data, &instruments, d2).await;
        book.update(&day_two);

        assert_eq!(day_two.len(), 1);
        assert_eq!(book.get("AAPL"), Some(dec!(192)));
        assert_eq!(book.get("MSFT"), Some(dec!(410)));
    }

    #[tokio::test]
    async fn held_instruments_are_seeded_from_history_or_cost() {
        let d1 = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let data = InMemoryMarketData::new()
            .with_closes("MSFT", &[(d1, dec!(410))])
            .unwrap();
        let sim = executor::ExecutionSimulator::new(true);
        let mut portfolio = Portfolio::new(dec!(100000), dec!(0.5)).unwrap();
        for (instrument, action) in [("MSFT", Action::Buy), ("TSLA", Action::Short)] {
            let decision = Decision {
                instrument: instrument.to_string(),
                action,
                quantity: 10,
                confidence: Decimal::ONE,
                rationale: String::new(),
            };
            sim.execute(&mut portfolio, &decision, dec!(400)).unwrap();
        }
        let mut book = MarkBook::new();

        book.seed_open_positions(&data, &portfolio, d2).await;

        assert_eq!(book.get("MSFT"), Some(dec!(410)));
        // TSLA has no history at all and is carried at its short entry price.
        assert_eq!(book.get("TSLA"), Some(dec!(400)));
        assert!(portfolio.total_value(book.marks()).is_ok());
    }
}
