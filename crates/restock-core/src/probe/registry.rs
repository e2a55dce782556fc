use std::collections::HashMap;
use std::sync::Arc;

use super::Probe;

/// Maps a source name to the probe that knows how to check it.
///
/// Lookup is exact and case-sensitive, matching the `(source, item)` key
/// discipline of the state store.
#[derive(Default, Clone)]
pub struct ProbeRegistry {
    probes: HashMap<String, Arc<dyn Probe>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: impl Into<String>, probe: Arc<dyn Probe>) {
        self.probes.insert(source.into(), probe);
    }

    pub fn with_probe(mut self, source: impl Into<String>, probe: Arc<dyn Probe>) -> Self {
        self.register(source, probe);
        self
    }

    pub fn get(&self, source: &str) -> Option<Arc<dyn Probe>> {
        self.probes.get(source).cloned()
    }

    pub fn sources(&self) -> Vec<String> {
        self.probes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}
