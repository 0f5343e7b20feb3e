use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Valuation on {date} must follow the last recorded date {last}")]
    OutOfOrder { date: NaiveDate, last: NaiveDate },
}
