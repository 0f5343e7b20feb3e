//! # Council Engine
//!
//! The orchestrator. Each cycle fans out to every analyst, waits for all of them,
//! computes risk limits, and resolves one decision per instrument. What happens to
//! the decisions depends on the mode: the backtester fills them on the simulator,
//! `LiveEngine` hands them to a `DecisionSink`.

pub mod collector;
pub mod error;
pub mod live;
pub mod phase;
pub mod pipeline;
pub mod pricing;

pub use collector::SignalCollector;
pub use error::EngineError;
pub use live::{LiveCycleReport, LiveEngine};
pub use phase::CyclePhase;
pub use pipeline::{CycleOutcome, DecisionPipeline};
pub use pricing::{MarkBook, fetch_prices};
