use crate::error::EngineError;
use crate::phase::CyclePhase;
use crate::pipeline::{CycleOutcome, DecisionPipeline};
use crate::pricing::MarkBook;
use analytics::{AnalyticsError, ValuationHistory};
use chrono::NaiveDate;
use core_types::ValuationPoint;
use executor::{DecisionSink, OrderTicket, Portfolio};
use std::sync::Arc;

/// The result of one live cycle.
#[derive(Debug, Clone)]
pub struct LiveCycleReport {
    pub outcome: CycleOutcome,
    pub tickets: Vec<OrderTicket>,
    pub valuation: ValuationPoint,
}

/// The central orchestrator for live decision making.
///
/// A live cycle decides exactly like a backtest cycle, then hands the decisions to a
/// `DecisionSink` instead of the simulator. The portfolio is only ever read here;
/// reconciling it with what the sink actually filled is up to the embedding
/// application through `replace_portfolio`.
pub struct LiveEngine {
    pipeline: DecisionPipeline,
    sink: Arc<dyn DecisionSink>,
    portfolio: Portfolio,
    marks: MarkBook,
    history: ValuationHistory,
}

impl LiveEngine {
    pub fn new(pipeline: DecisionPipeline, sink: Arc<dyn DecisionSink>, portfolio: Portfolio) -> Self {
        tracing::info!(
            phase = %CyclePhase::Init,
            instruments = pipeline.instruments().len(),
            cash = %portfolio.cash(),
            "live engine ready"
        );
        Self {
            pipeline,
            sink,
            portfolio,
            marks: MarkBook::new(),
            history: ValuationHistory::new(),
        }
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn instruments(&self) -> &[String] {
        self.pipeline.instruments()
    }

    pub fn history(&self) -> &ValuationHistory {
        &self.history
    }

    /// Swaps in the portfolio as reported by the broker after fills.
    pub fn replace_portfolio(&mut self, portfolio: Portfolio) {
        self.portfolio = portfolio;
    }

    /// Runs one cycle for `as_of` and submits its decisions.
    ///
    /// `as_of` must come after the last cycle's date; a repeated or earlier date is
    /// rejected before anything reaches the sink.
    pub async fn run_cycle(&mut self, as_of: NaiveDate) -> Result<LiveCycleReport, EngineError> {
        if let Some(last) = self.history.last() {
            if as_of <= last.date {
                return Err(AnalyticsError::OutOfOrder {
                    date: as_of,
                    last: last.date,
                }
                .into());
            }
        }

        let outcome = self
            .pipeline
            .run_cycle(&self.portfolio, &mut self.marks, as_of)
            .await?;

        tracing::debug!(phase = %CyclePhase::Execute, %as_of, "handing decisions to sink");
        let tickets = self.sink.submit(as_of, &outcome.decisions).await?;

        tracing::debug!(phase = %CyclePhase::RecordValuation, %as_of);
        let valuation = ValuationPoint {
            date: as_of,
            total_value: self.portfolio.total_value(self.marks.marks())?,
        };
        self.history.record(valuation)?;

        tracing::info!(
            phase = %CyclePhase::Finalize,
            %as_of,
            orders = tickets.len(),
            total_value = %valuation.total_value,
            "live cycle complete"
        );
        Ok(LiveCycleReport {
            outcome,
            tickets,
            valuation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysts::{AnalystError, AnalystRegistry, SignalSource};
    use async_trait::async_trait;
    use core_types::{Action, Decision, Direction, Signal};
    use executor::{ExecutionSimulator, PaperBroker};
    use market_data::InMemoryMarketData;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct AlwaysBullish;

    #[async_trait]
    impl SignalSource for AlwaysBullish {
        fn id(&self) -> &str {
            "always"
        }
        async fn produce(&self, instrument: &str, _as_of: NaiveDate) -> Result<Signal, AnalystError> {
            Ok(Signal::new("always", instrument, Direction::Bullish, dec!(0.9), "")?)
        }
    }

    fn pipeline(data: InMemoryMarketData) -> DecisionPipeline {
        let config = configuration::load_config_from_str(
            r#"
            [simulation]
            initial_cash = 100000
            "#,
        )
        .unwrap();
        let mut registry = AnalystRegistry::new();
        registry.register(Arc::new(AlwaysBullish)).unwrap();
        DecisionPipeline::new(
            &config,
            ["AAPL".to_string(), "MSFT".to_string()],
            registry,
            Arc::new(data),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn decisions_go_to_the_sink_and_portfolio_is_untouched() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let data = InMemoryMarketData::new()
            .with_closes("AAPL", &[(day, dec!(150.25))])
            .unwrap();
        let broker = Arc::new(PaperBroker::new());
        let portfolio = Portfolio::new(dec!(100000), dec!(0.5)).unwrap();
        let mut engine = LiveEngine::new(pipeline(data), broker.clone(), portfolio.clone());

        let report = engine.run_cycle(day).await.unwrap();

        assert_eq!(report.outcome.decisions["AAPL"].action, Action::Buy);
        assert_eq!(report.outcome.decisions["AAPL"].quantity, 133);
        assert_eq!(report.tickets.len(), 1);
        assert_eq!(broker.orders().await.len(), 1);
        assert_eq!(engine.portfolio(), &portfolio);
        assert_eq!(report.valuation.total_value, dec!(100000));
        assert_eq!(engine.history().len(), 1);
    }

    #[tokio::test]
    async fn held_instrument_without_todays_price_does_not_block_others() {
        let d1 = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let data = InMemoryMarketData::new()
            .with_closes("AAPL", &[(d2, dec!(150.25))])
            .unwrap()
            .with_closes("MSFT", &[(d1, dec!(410))])
            .unwrap();
        let mut portfolio = Portfolio::new(dec!(100000), dec!(0.5)).unwrap();
        let buy = Decision {
            instrument: "MSFT".to_string(),
            action: Action::Buy,
            quantity: 10,
            confidence: Decimal::ONE,
            rationale: String::new(),
        };
        ExecutionSimulator::new(true)
            .execute(&mut portfolio, &buy, dec!(400))
            .unwrap();
        let mut engine = LiveEngine::new(pipeline(data), Arc::new(PaperBroker::new()), portfolio);

        let report = engine.run_cycle(d2).await.unwrap();

        // 96000 cash + 10 MSFT carried at the previous close of 410.
        assert_eq!(report.valuation.total_value, dec!(100100));
        // 20% of 100100 at 150.25
        assert_eq!(report.outcome.decisions["AAPL"].quantity, 133);
        assert!(!report.outcome.decisions.contains_key("MSFT"));
        assert_eq!(report.tickets.len(), 1);
    }

    #[tokio::test]
    async fn repeated_date_is_rejected_before_submitting() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let data = InMemoryMarketData::new()
            .with_closes("AAPL", &[(day, dec!(150.25))])
            .unwrap();
        let broker = Arc::new(PaperBroker::new());
        let portfolio = Portfolio::new(dec!(100000), dec!(0.5)).unwrap();
        let mut engine = LiveEngine::new(pipeline(data), broker.clone(), portfolio);

        engine.run_cycle(day).await.unwrap();
        let again = engine.run_cycle(day).await;

        assert!(matches!(
            again,
            Err(EngineError::Analytics(AnalyticsError::OutOfOrder { .. }))
        ));
        assert_eq!(broker.orders().await.len(), 1);
        assert_eq!(engine.history().len(), 1);
    }
}
