//! # Council Decision Crate
//!
//! Reconciles the signals of every analyst into exactly one `Decision` per instrument,
//! sized within the cycle's risk limits and what the portfolio can actually afford.

pub mod engine;
mod tally;

pub use engine::DecisionEngine;
