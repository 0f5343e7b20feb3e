use crate::collector::SignalCollector;
use crate::error::EngineError;
use crate::phase::CyclePhase;
use crate::pricing::{MarkBook, fetch_prices};
use analysts::AnalystRegistry;
use chrono::NaiveDate;
use configuration::Config;
use core_types::{Decision, RiskLimit, Signal};
use decision::DecisionEngine;
use executor::Portfolio;
use market_data::MarketData;
use risk::{PositionLimitRiskManager, RiskManager};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

/// Everything one cycle produced before any execution.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub as_of: NaiveDate,
    pub signals: BTreeMap<String, Vec<Signal>>,
    pub limits: BTreeMap<String, RiskLimit>,
    /// Instruments priced on `as_of`. Gapped instruments are absent.
    pub prices: BTreeMap<String, Decimal>,
    pub decisions: BTreeMap<String, Decision>,
}

/// The shared COLLECT_SIGNALS -> COMPUTE_RISK -> DECIDE pipeline.
///
/// Live and backtest runs differ only in what they do with the decisions; both drive
/// the same pipeline so a backtest exercises exactly the code a live run would.
pub struct DecisionPipeline {
    instruments: Vec<String>,
    collector: SignalCollector,
    risk_manager: Arc<dyn RiskManager>,
    decision_engine: DecisionEngine,
    market_data: Arc<dyn MarketData>,
}

impl DecisionPipeline {
    /// Builds a pipeline with the position-limit risk manager configured in `config`.
    pub fn new(
        config: &Config,
        instruments: impl IntoIterator<Item = String>,
        registry: AnalystRegistry,
        market_data: Arc<dyn MarketData>,
    ) -> Result<Self, EngineError> {
        let risk_manager = PositionLimitRiskManager::new(config.risk_management.clone())?;
        Self::from_parts(
            instruments,
            SignalCollector::new(
                registry,
                Duration::from_millis(config.orchestrator.source_timeout_ms),
            ),
            Arc::new(risk_manager),
            DecisionEngine::new(config.simulation.allow_shorting),
            market_data,
        )
    }

    pub fn from_parts(
        instruments: impl IntoIterator<Item = String>,
        collector: SignalCollector,
        risk_manager: Arc<dyn RiskManager>,
        decision_engine: DecisionEngine,
        market_data: Arc<dyn MarketData>,
    ) -> Result<Self, EngineError> {
        // Ascending, de-duplicated: this is the order shared cash is handed out in.
        let instruments: Vec<String> = instruments
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if instruments.is_empty() {
            return Err(EngineError::Configuration(
                "at least one instrument is required".to_string(),
            ));
        }
        if collector.registry().is_empty() {
            return Err(EngineError::Configuration(
                "at least one analyst must be registered".to_string(),
            ));
        }
        Ok(Self {
            instruments,
            collector,
            risk_manager,
            decision_engine,
            market_data,
        })
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn market_data(&self) -> &Arc<dyn MarketData> {
        &self.market_data
    }

    /// Runs one cycle for `as_of` against a read-only view of the portfolio.
    ///
    /// `marks` is updated with the prices observed on `as_of`; risk values the
    /// portfolio at those marks so held instruments with a gap keep their last price.
    /// A held instrument the book has never priced is seeded first.
    pub async fn run_cycle(
        &self,
        portfolio: &Portfolio,
        marks: &mut MarkBook,
        as_of: NaiveDate,
    ) -> Result<CycleOutcome, EngineError> {
        let prices = fetch_prices(self.market_data.as_ref(), &self.instruments, as_of).await;
        marks.update(&prices);
        marks
            .seed_open_positions(self.market_data.as_ref(), portfolio, as_of)
            .await;
        let priced: Vec<String> = prices.keys().cloned().collect();

        tracing::debug!(phase = %CyclePhase::CollectSignals, %as_of, instruments = priced.len());
        let signals = self.collector.collect(&priced, as_of).await;

        tracing::debug!(phase = %CyclePhase::ComputeRisk, %as_of);
        let limits = self
            .risk_manager
            .compute_limits(portfolio, &priced, marks.marks())?;

        tracing::debug!(phase = %CyclePhase::Decide, %as_of);
        let decisions = self
            .decision_engine
            .decide(&signals, &limits, portfolio, &prices);

        let actionable = decisions.values().filter(|d| !d.is_noop()).count();
        tracing::info!(%as_of, priced = priced.len(), actionable, "cycle decided");

        Ok(CycleOutcome {
            as_of,
            signals,
            limits,
            prices,
            decisions,
        })
    }
}
