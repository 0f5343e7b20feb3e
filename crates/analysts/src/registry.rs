use crate::error::AnalystError;
use crate::SignalSource;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named signal sources, iterated in name order.
#[derive(Default, Clone)]
pub struct AnalystRegistry {
    sources: BTreeMap<String, Arc<dyn SignalSource>>,
}

impl AnalystRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source under its own id. Ids must be unique.
    pub fn register(&mut self, source: Arc<dyn SignalSource>) -> Result<(), AnalystError> {
        let id = source.id().to_string();
        if self.sources.contains_key(&id) {
            return Err(AnalystError::DuplicateSource(id));
        }
        tracing::debug!(analyst = %id, "analyst registered");
        self.sources.insert(id, source);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn SignalSource>> {
        self.sources.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn sources(&self) -> impl Iterator<Item = &Arc<dyn SignalSource>> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for AnalystRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.sources.keys()).finish()
    }
}
