use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StateStore, StoreError};
use crate::monitor::observation::Observation;

/// In-memory reference store: append-only per-key history behind a lock.
///
/// `latest` never observes a partially written record and appends for the
/// same key cannot interleave; the write lock covers both the duplicate-id
/// check and the insert.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    history: HashMap<(String, String), Vec<Observation>>,
    ids: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full history for a key, oldest first. Mainly for tests and inspection.
    pub async fn history(&self, source: &str, item: &str) -> Vec<Observation> {
        let inner = self.inner.read().await;
        inner
            .history
            .get(&(source.to_string(), item.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.ids.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.ids.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn append(&self, observation: Observation) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.ids.insert(observation.id.clone()) {
            return Err(StoreError::DuplicateId {
                id: observation.id,
            });
        }
        inner
            .history
            .entry((observation.source.clone(), observation.item.clone()))
            .or_default()
            .push(observation);
        Ok(())
    }

    async fn latest(
        &self,
        source: &str,
        item: &str,
    ) -> Result<Option<Observation>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .history
            .get(&(source.to_string(), item.to_string()))
            .and_then(|observations| observations.last())
            .cloned())
    }
}
