use crate::error::AnalyticsError;
use core_types::ValuationPoint;
use serde::{Deserialize, Serialize};

/// Portfolio values in strictly increasing date order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ValuationPoint>", into = "Vec<ValuationPoint>")]
pub struct ValuationHistory {
    points: Vec<ValuationPoint>,
}

impl ValuationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a point dated after every point already recorded.
    pub fn record(&mut self, point: ValuationPoint) -> Result<(), AnalyticsError> {
        if let Some(last) = self.points.last() {
            if point.date <= last.date {
                return Err(AnalyticsError::OutOfOrder {
                    date: point.date,
                    last: last.date,
                });
            }
        }
        self.points.push(point);
        Ok(())
    }

    pub fn points(&self) -> &[ValuationPoint] {
        &self.points
    }

    pub fn first(&self) -> Option<&ValuationPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&ValuationPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl TryFrom<Vec<ValuationPoint>> for ValuationHistory {
    type Error = AnalyticsError;

    fn try_from(points: Vec<ValuationPoint>) -> Result<Self, Self::Error> {
        let mut history = Self::new();
        for point in points {
            history.record(point)?;
        }
        Ok(history)
    }
}

impl From<ValuationHistory> for Vec<ValuationPoint> {
    fn from(history: ValuationHistory) -> Self {
        history.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn point(day: u32, value: rust_decimal::Decimal) -> ValuationPoint {
        ValuationPoint {
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            total_value: value,
        }
    }

    #[test]
    fn rejects_repeated_and_earlier_dates() {
        let mut history = ValuationHistory::new();
        history.record(point(2, dec!(100))).unwrap();

        assert!(history.record(point(2, dec!(101))).is_err());
        assert!(history.record(point(1, dec!(101))).is_err());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn deserializing_validates_order() {
        let ok = r#"[{"date":"2024-05-01","total_value":"100"},{"date":"2024-05-02","total_value":"101"}]"#;
        let history: ValuationHistory = serde_json::from_str(ok).unwrap();
        assert_eq!(history.last().unwrap().total_value, dec!(101));

        let bad = r#"[{"date":"2024-05-02","total_value":"100"},{"date":"2024-05-01","total_value":"101"}]"#;
        assert!(serde_json::from_str::<ValuationHistory>(bad).is_err());
    }
}
