use crate::error::AnalystError;
use crate::momentum::MomentumAnalyst;
use crate::registry::AnalystRegistry;
use crate::trend::TrendAnalyst;
use crate::SignalSource;
use configuration::{AnalystId, Config};
use market_data::MarketData;
use std::sync::Arc;

/// Creates a new analyst instance based on the provided ID and configuration.
pub fn create_analyst(
    id: AnalystId,
    config: &Config,
    market_data: Arc<dyn MarketData>,
) -> Result<Arc<dyn SignalSource>, AnalystError> {
    match id {
        AnalystId::Trend => {
            let params = config.analysts.trend.clone();
            Ok(Arc::new(TrendAnalyst::new(params, market_data)?))
        }
        AnalystId::Momentum => {
            let params = config.analysts.momentum.clone();
            Ok(Arc::new(MomentumAnalyst::new(params, market_data)?))
        }
    }
}

/// Builds a registry holding every analyst listed in `analysts.enabled`.
pub fn registry_from_config(
    config: &Config,
    market_data: Arc<dyn MarketData>,
) -> Result<AnalystRegistry, AnalystError> {
    let mut registry = AnalystRegistry::new();
    for id in &config.analysts.enabled {
        registry.register(create_analyst(*id, config, market_data.clone())?)?;
    }
    Ok(registry)
}
