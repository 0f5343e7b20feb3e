use analysts::{AnalystRegistry, SignalSource};
use chrono::NaiveDate;
use core_types::Signal;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Fans out every (source, instrument) request of a cycle at once and waits for all
/// of them before returning.
///
/// A source that errors, times out or answers for the wrong instrument contributes
/// a neutral zero-confidence signal instead, so one bad source never holds up or
/// aborts the cycle.
pub struct SignalCollector {
    registry: AnalystRegistry,
    timeout: Duration,
}

impl SignalCollector {
    pub fn new(registry: AnalystRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &AnalystRegistry {
        &self.registry
    }

    /// One entry per instrument, holding one signal per registered source in
    /// source-name order.
    pub async fn collect(
        &self,
        instruments: &[String],
        as_of: NaiveDate,
    ) -> BTreeMap<String, Vec<Signal>> {
        let requests = instruments.iter().flat_map(|instrument| {
            self.registry
                .sources()
                .map(move |source| self.request(source.clone(), instrument.clone(), as_of))
        });
        let results = join_all(requests).await;

        let mut by_instrument: BTreeMap<String, Vec<Signal>> = instruments
            .iter()
            .map(|instrument| (instrument.clone(), Vec::new()))
            .collect();
        for (instrument, signal) in results {
            by_instrument.entry(instrument).or_default().push(signal);
        }
        by_instrument
    }

    async fn request(
        &self,
        source: Arc<dyn SignalSource>,
        instrument: String,
        as_of: NaiveDate,
    ) -> (String, Signal) {
        let source_id = source.id().to_string();
        let outcome = tokio::time::timeout(self.timeout, source.produce(&instrument, as_of)).await;

        let signal = match outcome {
            Ok(Ok(signal))
                if signal.instrument() == instrument && signal.source_id() == source_id =>
            {
                signal
            }
            Ok(Ok(signal)) => {
                tracing::warn!(
                    source = %source_id,
                    %instrument,
                    answered_for = signal.instrument(),
                    "source answered for the wrong instrument, using neutral signal"
                );
                Signal::neutral(&source_id, &instrument, "mismatched response")
            }
            Ok(Err(e)) => {
                tracing::warn!(source = %source_id, %instrument, error = %e, "source unavailable, using neutral signal");
                Signal::neutral(&source_id, &instrument, format!("source unavailable: {}", e))
            }
            Err(_) => {
                tracing::warn!(
                    source = %source_id,
                    %instrument,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "source timed out, using neutral signal"
                );
                Signal::neutral(
                    &source_id,
                    &instrument,
                    format!("timed out after {}ms", self.timeout.as_millis()),
                )
            }
        };

        (instrument, signal)
    }
}
