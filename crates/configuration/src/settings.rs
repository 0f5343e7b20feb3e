use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub simulation: Simulation,
    #[serde(default)]
    pub risk_management: RiskManagement,
    #[serde(default)]
    pub analytics: AnalyticsParams,
    #[serde(default)]
    pub orchestrator: Orchestrator,
    #[serde(default)]
    pub analysts: Analysts,
}

/// Contains parameters for the portfolio and the execution simulator.
#[derive(Debug, Clone, Deserialize)]
pub struct Simulation {
    /// Cash the portfolio starts with.
    pub initial_cash: Decimal,
    /// Fraction of short notional reserved as collateral (0.5 = 50%).
    #[serde(default = "default_margin_requirement")]
    pub margin_requirement: Decimal,
    /// When false, bearish consensus can only close longs.
    #[serde(default = "default_true")]
    pub allow_shorting: bool,
}

/// Contains parameters for portfolio-level exposure limits.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskManagement {
    /// Fraction of total portfolio value a single long position may reach.
    #[serde(default = "default_position_limit_fraction")]
    pub position_limit_fraction: Decimal,
    /// Fraction of total portfolio value a single short position may reach.
    #[serde(default = "default_position_limit_fraction")]
    pub short_limit_fraction: Decimal,
}

impl Default for RiskManagement {
    fn default() -> Self {
        Self {
            position_limit_fraction: default_position_limit_fraction(),
            short_limit_fraction: default_position_limit_fraction(),
        }
    }
}

/// Parameters for the performance statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsParams {
    /// 0.0434 corresponds to 4.34% per year.
    #[serde(default = "default_risk_free_rate")]
    pub annual_risk_free_rate: f64,
    #[serde(default = "default_trading_days")]
    pub trading_days_per_year: u32,
    /// Standard deviations below this leave the ratios undefined.
    #[serde(default = "default_min_std_dev")]
    pub min_std_dev: f64,
}

impl Default for AnalyticsParams {
    fn default() -> Self {
        Self {
            annual_risk_free_rate: default_risk_free_rate(),
            trading_days_per_year: default_trading_days(),
            min_std_dev: default_min_std_dev(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Orchestrator {
    /// How long a single source may take to produce one signal.
    #[serde(default = "default_source_timeout_ms")]
    pub source_timeout_ms: u64,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self {
            source_timeout_ms: default_source_timeout_ms(),
        }
    }
}

/// Identifies one of the built-in analysts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum AnalystId {
    Trend,
    Momentum,
}

impl AnalystId {
    /// The registry name the analyst is published under.
    pub fn name(&self) -> &'static str {
        match self {
            AnalystId::Trend => "trend",
            AnalystId::Momentum => "momentum",
        }
    }
}

/// Contains the enabled analysts and the parameter sets for each of them.
#[derive(Debug, Clone, Deserialize)]
pub struct Analysts {
    #[serde(default = "default_enabled_analysts")]
    pub enabled: Vec<AnalystId>,
    #[serde(default)]
    pub trend: TrendParams,
    #[serde(default)]
    pub momentum: MomentumParams,
}

impl Default for Analysts {
    fn default() -> Self {
        Self {
            enabled: default_enabled_analysts(),
            trend: TrendParams::default(),
            momentum: MomentumParams::default(),
        }
    }
}

/// Parameters for the moving-average trend analyst.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendParams {
    pub fast_period: usize,
    pub slow_period: usize,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            fast_period: 10,
            slow_period: 30,
        }
    }
}

/// Parameters for the rate-of-change momentum analyst.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MomentumParams {
    pub period: usize,
    /// Rate of change, in percent, needed before the analyst takes a side.
    pub threshold_pct: f64,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            period: 20,
            threshold_pct: 2.0,
        }
    }
}

impl Config {
    /// Rejects parameter combinations that cannot be traded safely.
    ///
    /// Nothing is clamped or corrected here; an invalid value is always an error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.initial_cash <= Decimal::ZERO {
            return Err(invalid("simulation.initial_cash must be positive"));
        }
        if sim.margin_requirement < Decimal::ZERO || sim.margin_requirement > Decimal::ONE {
            return Err(invalid("simulation.margin_requirement must be within [0, 1]"));
        }

        let risk = &self.risk_management;
        for (name, value) in [
            ("position_limit_fraction", risk.position_limit_fraction),
            ("short_limit_fraction", risk.short_limit_fraction),
        ] {
            if value <= Decimal::ZERO || value > Decimal::ONE {
                return Err(invalid(&format!(
                    "risk_management.{} must be within (0, 1], got {}",
                    name, value
                )));
            }
        }

        let analytics = &self.analytics;
        if !analytics.annual_risk_free_rate.is_finite() {
            return Err(invalid("analytics.annual_risk_free_rate must be finite"));
        }
        if analytics.trading_days_per_year == 0 {
            return Err(invalid("analytics.trading_days_per_year must be positive"));
        }
        if !(analytics.min_std_dev > 0.0) {
            return Err(invalid("analytics.min_std_dev must be positive"));
        }

        if self.orchestrator.source_timeout_ms == 0 {
            return Err(invalid("orchestrator.source_timeout_ms must be positive"));
        }

        let analysts = &self.analysts;
        if analysts.trend.fast_period == 0 || analysts.trend.fast_period >= analysts.trend.slow_period {
            return Err(invalid(
                "analysts.trend.fast_period must be positive and below slow_period",
            ));
        }
        if analysts.momentum.period == 0 {
            return Err(invalid("analysts.momentum.period must be positive"));
        }
        if !(analysts.momentum.threshold_pct >= 0.0) {
            return Err(invalid("analysts.momentum.threshold_pct must be non-negative"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

fn default_margin_requirement() -> Decimal {
    dec!(0.5)
}

fn default_true() -> bool {
    true
}

fn default_position_limit_fraction() -> Decimal {
    dec!(0.20)
}

fn default_risk_free_rate() -> f64 {
    0.0434
}

fn default_trading_days() -> u32 {
    252
}

fn default_min_std_dev() -> f64 {
    1e-12
}

fn default_source_timeout_ms() -> u64 {
    30_000
}

fn default_enabled_analysts() -> Vec<AnalystId> {
    vec![AnalystId::Trend, AnalystId::Momentum]
}
