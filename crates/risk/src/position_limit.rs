use crate::error::RiskError;
use crate::RiskManager;
use configuration::RiskManagement;
use core_types::RiskLimit;
use executor::Portfolio;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Caps each instrument at a fixed fraction of total portfolio value.
///
/// The long-side cap is further clipped to the cash on hand, since a buy can never
/// spend more than that.
#[derive(Debug, Clone)]
pub struct PositionLimitRiskManager {
    params: RiskManagement,
}

impl PositionLimitRiskManager {
    pub fn new(params: RiskManagement) -> Result<Self, RiskError> {
        check_fraction("position_limit_fraction", params.position_limit_fraction)?;
        check_fraction("short_limit_fraction", params.short_limit_fraction)?;
        Ok(Self { params })
    }
}

fn check_fraction(name: &str, value: Decimal) -> Result<(), RiskError> {
    if value <= Decimal::ZERO || value > Decimal::ONE {
        return Err(RiskError::InvalidParameters(format!(
            "{} must be within (0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

impl RiskManager for PositionLimitRiskManager {
    fn compute_limits(
        &self,
        portfolio: &Portfolio,
        instruments: &[String],
        prices: &BTreeMap<String, Decimal>,
    ) -> Result<BTreeMap<String, RiskLimit>, RiskError> {
        let total_value = portfolio.total_value(prices)?;
        let cash = portfolio.cash();
        let long_cap = (total_value * self.params.position_limit_fraction)
            .max(Decimal::ZERO)
            .min(cash);
        let short_cap = (total_value * self.params.short_limit_fraction).max(Decimal::ZERO);

        let mut limits = BTreeMap::new();
        for instrument in instruments {
            if !prices.contains_key(instrument) {
                tracing::debug!(%instrument, "no price, no risk limit");
                continue;
            }
            limits.insert(
                instrument.clone(),
                RiskLimit {
                    instrument: instrument.clone(),
                    max_position_value: long_cap,
                    max_short_value: short_cap,
                    available_cash_snapshot: cash,
                },
            );
        }

        tracing::debug!(%total_value, %long_cap, %short_cap, count = limits.len(), "risk limits computed");
        Ok(limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params(long: Decimal, short: Decimal) -> RiskManagement {
        RiskManagement {
            position_limit_fraction: long,
            short_limit_fraction: short,
        }
    }

    #[test]
    fn rejects_fractions_outside_unit_interval() {
        assert!(PositionLimitRiskManager::new(params(dec!(0), dec!(0.2))).is_err());
        assert!(PositionLimitRiskManager::new(params(dec!(-0.1), dec!(0.2))).is_err());
        assert!(PositionLimitRiskManager::new(params(dec!(0.2), dec!(1.5))).is_err());
        assert!(PositionLimitRiskManager::new(params(dec!(1), dec!(1))).is_ok());
    }

    #[test]
    fn limit_is_fraction_of_total_value() {
        let manager = PositionLimitRiskManager::new(RiskManagement::default()).unwrap();
        let portfolio = Portfolio::new(dec!(100000), dec!(0.5)).unwrap();
        let prices = BTreeMap::from([("AAPL".to_string(), dec!(150.25))]);

        let limits = manager
            .compute_limits(&portfolio, &["AAPL".to_string()], &prices)
            .unwrap();

        let limit = &limits["AAPL"];
        assert_eq!(limit.max_position_value, dec!(20000));
        assert_eq!(limit.max_short_value, dec!(20000));
        assert_eq!(limit.available_cash_snapshot, dec!(100000));
    }

    #[test]
    fn long_limit_is_clipped_to_cash() {
        let manager = PositionLimitRiskManager::new(params(dec!(1), dec!(0.2))).unwrap();
        let portfolio = Portfolio::new(dec!(5000), dec!(0.5)).unwrap();
        let prices = BTreeMap::from([("AAPL".to_string(), dec!(10))]);

        let limits = manager
            .compute_limits(&portfolio, &["AAPL".to_string()], &prices)
            .unwrap();

        assert_eq!(limits["AAPL"].max_position_value, dec!(5000));
    }

    #[test]
    fn instrument_without_price_gets_no_limit() {
        let manager = PositionLimitRiskManager::new(RiskManagement::default()).unwrap();
        let portfolio = Portfolio::new(dec!(1000), dec!(0.5)).unwrap();
        let prices = BTreeMap::from([("AAPL".to_string(), dec!(10))]);
        let instruments = vec!["AAPL".to_string(), "MSFT".to_string()];

        let limits = manager.compute_limits(&portfolio, &instruments, &prices).unwrap();

        assert!(limits.contains_key("AAPL"));
        assert!(!limits.contains_key("MSFT"));
    }
}
