use analysts::{AnalystError, AnalystRegistry, SignalSource};
use async_trait::async_trait;
use backtester::{BacktestError, BacktestReport, Backtester};
use chrono::NaiveDate;
use core_types::{Action, Direction, Signal};
use engine::DecisionPipeline;
use market_data::{InMemoryMarketData, MarketDataError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Votes a fixed direction per date with full confidence.
struct Scripted {
    script: BTreeMap<NaiveDate, Direction>,
}

#[async_trait]
impl SignalSource for Scripted {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn produce(&self, instrument: &str, as_of: NaiveDate) -> Result<Signal, AnalystError> {
        match self.script.get(&as_of) {
            Some(Direction::Neutral) | None => Ok(Signal::neutral("scripted", instrument, "no view")),
            Some(direction) => Ok(Signal::new("scripted", instrument, *direction, Decimal::ONE, "script")?),
        }
    }
}

/// Always fails, like a remote analyst that is down.
struct Offline;

#[async_trait]
impl SignalSource for Offline {
    fn id(&self) -> &str {
        "offline"
    }

    async fn produce(&self, instrument: &str, _as_of: NaiveDate) -> Result<Signal, AnalystError> {
        Err(MarketDataError::UnknownInstrument(instrument.to_string()).into())
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
}

fn config() -> configuration::Config {
    configuration::load_config_from_str(
        r#"
        [simulation]
        initial_cash = 100000
        margin_requirement = 0.5

        [orchestrator]
        source_timeout_ms = 1000
        "#,
    )
    .unwrap()
}

/// AAPL trades every day; MSFT has no price on the 2nd.
fn market() -> InMemoryMarketData {
    InMemoryMarketData::new()
        .with_closes("AAPL", &[(day(1), dec!(100)), (day(2), dec!(110)), (day(3), dec!(110))])
        .unwrap()
        .with_closes("MSFT", &[(day(1), dec!(200)), (day(3), dec!(220))])
        .unwrap()
}

fn backtester() -> Backtester {
    let config = config();
    let mut registry = AnalystRegistry::new();
    registry
        .register(Arc::new(Scripted {
            script: BTreeMap::from([
                (day(1), Direction::Bullish),
                (day(2), Direction::Bearish),
                (day(3), Direction::Neutral),
            ]),
        }))
        .unwrap();
    registry.register(Arc::new(Offline)).unwrap();

    let pipeline = DecisionPipeline::new(
        &config,
        ["MSFT".to_string(), "AAPL".to_string()],
        registry,
        Arc::new(market()),
    )
    .unwrap();
    Backtester::new(&config, pipeline).unwrap()
}

#[tokio::test]
async fn gap_skips_only_the_gapped_instrument() {
    let report = backtester().run(day(1), day(3)).await.unwrap();

    let values: Vec<Decimal> = report.history.points().iter().map(|p| p.total_value).collect();
    // Day 2 carries MSFT at its day 1 mark of 200.
    assert_eq!(values, vec![dec!(100000), dec!(102000), dec!(104000)]);

    let summary: Vec<(NaiveDate, &str, Action, u64)> = report
        .trades
        .iter()
        .map(|t| (t.date, t.instrument.as_str(), t.action, t.filled))
        .collect();
    assert_eq!(
        summary,
        vec![
            (day(1), "AAPL", Action::Buy, 200),
            (day(1), "MSFT", Action::Buy, 100),
            (day(2), "AAPL", Action::Sell, 200),
        ]
    );

    let msft = report
        .final_portfolio
        .positions
        .iter()
        .find(|p| p.instrument() == "MSFT")
        .unwrap();
    assert_eq!(msft.long_shares(), 100);
    assert_eq!(report.final_portfolio.cash, dec!(82000));
    assert_eq!(report.final_value, dec!(104000));
    assert_eq!(report.metrics.total_return, dec!(0.04));
    assert_eq!(report.metrics.max_drawdown, Decimal::ZERO);
    assert_eq!(report.instruments, vec!["AAPL".to_string(), "MSFT".to_string()]);
}

#[tokio::test]
async fn report_survives_a_json_round_trip() {
    let report = backtester().run(day(1), day(3)).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");

    report.save_json(&path).unwrap();
    let loaded = BacktestReport::load_json(&path).unwrap();

    assert_eq!(loaded.history, report.history);
    assert_eq!(loaded.trades, report.trades);
    assert_eq!(loaded.final_portfolio, report.final_portfolio);
    assert_eq!(loaded.metrics.max_drawdown, report.metrics.max_drawdown);
}

#[tokio::test]
async fn inverted_range_is_rejected() {
    let result = backtester().run(day(3), day(1)).await;
    assert!(matches!(result, Err(BacktestError::InvalidRange { .. })));
}

#[tokio::test]
async fn range_without_trading_dates_is_rejected() {
    let result = backtester().run(day(10), day(20)).await;
    assert!(matches!(result, Err(BacktestError::DataUnavailable { .. })));
}

#[tokio::test]
async fn wiped_out_account_still_produces_a_report() {
    let config = configuration::load_config_from_str(
        r#"
        [simulation]
        initial_cash = 100000
        margin_requirement = 0.5

        [risk_management]
        short_limit_fraction = 1.0
        "#,
    )
    .unwrap();
    let mut registry = AnalystRegistry::new();
    registry
        .register(Arc::new(Scripted {
            script: BTreeMap::from([(day(1), Direction::Bearish), (day(2), Direction::Bearish)]),
        }))
        .unwrap();
    let data = InMemoryMarketData::new()
        .with_closes("AAPL", &[(day(1), dec!(100)), (day(2), dec!(200))])
        .unwrap();
    let pipeline =
        DecisionPipeline::new(&config, ["AAPL".to_string()], registry, Arc::new(data)).unwrap();

    let report = Backtester::new(&config, pipeline)
        .unwrap()
        .run(day(1), day(2))
        .await
        .unwrap();

    // 1000 shares shorted at 100; at 200 the loss equals the whole account.
    let values: Vec<Decimal> = report.history.points().iter().map(|p| p.total_value).collect();
    assert_eq!(values, vec![dec!(100000), dec!(0)]);
    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].action, Action::Short);
    assert_eq!(report.trades[0].filled, 1000);
    assert_eq!(report.final_value, dec!(0));
    assert_eq!(report.metrics.max_drawdown, Decimal::ONE);
    assert_eq!(report.metrics.total_return, dec!(-1));
    assert_eq!(report.final_portfolio.cash, dec!(150000));
}
