use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AnalystId, Analysts, AnalyticsParams, Config, MomentumParams, Orchestrator, RiskManagement,
    Simulation, TrendParams,
};

/// Loads and validates the application configuration.
///
/// The TOML file at `path` is the base layer; environment variables prefixed with
/// `COUNCIL` override it, using `__` between nesting levels
/// (e.g. `COUNCIL_SIMULATION__INITIAL_CASH=50000`).
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path.as_ref()))
        .add_source(
            config::Environment::with_prefix("COUNCIL")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;
    tracing::debug!(?config, "configuration loaded");

    Ok(config)
}

/// Parses and validates a configuration held in memory as TOML.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
