//! # Council Analytics
//!
//! The "unbiased judge" of a run: records the valuation history and derives
//! return and risk statistics from it.
//!
//! ## Architectural Principles
//!
//! - **Stateless Calculation:** `PerformanceAccountant` takes a history and produces
//!   `PerformanceMetrics`; calling it twice on the same input gives the same output.
//! - **Exact money, approximate statistics:** values and drawdowns stay in `Decimal`,
//!   ratios that need square roots are computed in `f64`.

pub mod engine;
pub mod error;
pub mod history;
pub mod report;

pub use engine::PerformanceAccountant;
pub use error::AnalyticsError;
pub use history::ValuationHistory;
pub use report::PerformanceMetrics;
