//! # Council Executor Crate
//!
//! This crate owns portfolio state and the rules for changing it. It provides the
//! `ExecutionSimulator` that fills decisions during a backtest, the `Portfolio` it
//! mutates, and the `DecisionSink` seam a live run hands its decisions to.
//!
//! ## Architectural Principles
//!
//! - **Single writer:** `Portfolio` exposes read access to everyone, but only the
//!   simulator can change cash, margin or positions. The decision engine reasons
//!   about affordability on a cloned projection, never on the real account.
//! - **Graceful degradation:** an order that cannot be afforded in full is filled
//!   for the largest whole-share quantity that keeps cash non-negative.
//!
//! ## Public API
//!
//! - `ExecutionSimulator`: The "virtual exchange" for backtesting.
//! - `Portfolio`, `Position`, `PortfolioSnapshot`: Account state.
//! - `DecisionSink`, `PaperBroker`, `OrderTicket`: The live hand-off.
//! - `ExecutorError`: The specific error types that can be returned from this crate.

pub mod broker;
pub mod error;
pub mod portfolio;
pub mod simulator;

pub use broker::{DecisionSink, OrderSide, OrderStatus, OrderTicket, PaperBroker};
pub use error::ExecutorError;
pub use portfolio::{Portfolio, PortfolioSnapshot, Position};
pub use simulator::ExecutionSimulator;
