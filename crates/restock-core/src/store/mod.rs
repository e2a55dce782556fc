mod jsonl;
mod memory;

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::monitor::observation::Observation;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode observation: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Duplicate observation id '{id}'")]
    DuplicateId { id: String },
}

/// Durable keyed history of observations.
///
/// `append` must not silently drop a record; a returned error means the
/// availability transition was NOT processed and the caller may retry the
/// whole check on the next pass. `latest` returns the most recently appended
/// observation for the exact `(source, item)` key.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn append(&self, observation: Observation) -> Result<(), StoreError>;

    async fn latest(
        &self,
        source: &str,
        item: &str,
    ) -> Result<Option<Observation>, StoreError>;
}
