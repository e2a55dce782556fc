use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{StateStore, StoreError};
use crate::monitor::observation::Observation;

/// Durable append-only store backed by a JSON-lines file.
///
/// Every observation is one JSON object per line, written in append order. A
/// latest-per-key index and the id set are rebuilt from the file at open, so
/// `latest` is O(1) after startup. The file is the source of truth; the index
/// is never written back.
pub struct JsonlStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

struct Inner {
    file: File,
    latest: HashMap<(String, String), Observation>,
    ids: HashSet<String>,
}

impl JsonlStore {
    /// Open (or create) the store file and rebuild the latest index.
    ///
    /// Lines that fail to parse are skipped with a warning rather than
    /// poisoning the whole store; the remaining history stays usable.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let mut latest = HashMap::new();
        let mut ids = HashSet::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for (line_no, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Observation>(line) {
                        Ok(obs) => {
                            ids.insert(obs.id.clone());
                            latest.insert((obs.source.clone(), obs.item.clone()), obs);
                        }
                        Err(e) => {
                            warn!(path = %path.display(), line = line_no + 1, error = %e, "Skipping unreadable observation line");
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        debug!(path = %path.display(), records = ids.len(), "Opened observation store");

        Ok(Self {
            path,
            inner: Mutex::new(Inner { file, latest, ids }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for JsonlStore {
    async fn append(&self, observation: Observation) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(&observation)?;
        line.push('\n');

        let mut inner = self.inner.lock().await;
        if inner.ids.contains(&observation.id) {
            return Err(StoreError::DuplicateId {
                id: observation.id,
            });
        }

        // Write before indexing: an indexed-but-unwritten record would claim
        // a transition was processed when it was not.
        inner.file.write_all(line.as_bytes()).await?;
        inner.file.flush().await?;

        inner.ids.insert(observation.id.clone());
        inner
            .latest
            .insert((observation.source.clone(), observation.item.clone()), observation);
        Ok(())
    }

    async fn latest(
        &self,
        source: &str,
        item: &str,
    ) -> Result<Option<Observation>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .latest
            .get(&(source.to_string(), item.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::observation::Target;

    #[tokio::test]
    async fn append_then_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::open(dir.path().join("obs.jsonl")).await.unwrap();

        let target = Target::new("argos", "console", "http://x");
        store.append(Observation::record(&target, false)).await.unwrap();
        let last = Observation::record(&target, true);
        let last_id = last.id.clone();
        store.append(last).await.unwrap();

        let latest = store.latest("argos", "console").await.unwrap().unwrap();
        assert_eq!(latest.id, last_id);
        assert!(latest.available);
    }

    #[tokio::test]
    async fn reopen_rebuilds_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.jsonl");

        let target = Target::new("currys", "gpu", "http://y");
        {
            let store = JsonlStore::open(&path).await.unwrap();
            store.append(Observation::record(&target, false)).await.unwrap();
            store.append(Observation::record(&target, true)).await.unwrap();
        }

        let reopened = JsonlStore::open(&path).await.unwrap();
        let latest = reopened.latest("currys", "gpu").await.unwrap().unwrap();
        assert!(latest.available);
        assert!(reopened.latest("argos", "gpu").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_id_rejected_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.jsonl");

        let target = Target::new("argos", "console", "http://x");
        let obs = Observation::record(&target, true);
        let id = obs.id.clone();

        {
            let store = JsonlStore::open(&path).await.unwrap();
            store.append(obs.clone()).await.unwrap();
        }

        let reopened = JsonlStore::open(&path).await.unwrap();
        let mut dup = Observation::record(&target, false);
        dup.id = id;
        let err = reopened.append(dup).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
    }

    #[tokio::test]
    async fn unreadable_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.jsonl");

        let target = Target::new("argos", "console", "http://x");
        let good = Observation::record(&target, true);
        let mut content = serde_json::to_string(&good).unwrap();
        content.push('\n');
        content.push_str("{not json}\n");
        tokio::fs::write(&path, content).await.unwrap();

        let store = JsonlStore::open(&path).await.unwrap();
        let latest = store.latest("argos", "console").await.unwrap().unwrap();
        assert_eq!(latest.id, good.id);
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::open(dir.path().join("fresh.jsonl")).await.unwrap();
        assert!(store.latest("argos", "console").await.unwrap().is_none());
    }
}
