//! Concurrent result store with snapshot/restore
//!
//! Maps package identifiers to their scan outcomes. Key presence is the
//! sole resumability signal: a worker skips any package already present.
//! Reads (existence checks, the periodic snapshot) run concurrently;
//! inserts are exclusive. Snapshots serialize under a read lock only, so
//! they never block inserts beyond that bounded critical section.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::ScanOutcome;

/// Concurrent mapping from package id to scan outcome
///
/// Backed by a `BTreeMap` so snapshots serialize deterministically:
/// `restore` followed by `snapshot` is a byte-for-byte no-op.
#[derive(Debug, Default)]
pub struct ResultStore {
    inner: RwLock<BTreeMap<String, ScanOutcome>>,
}

impl ResultStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `package` already has a stored outcome
    pub async fn contains(&self, package: &str) -> bool {
        self.inner.read().await.contains_key(package)
    }

    /// Clone the stored outcome for `package`, if any
    pub async fn get(&self, package: &str) -> Option<ScanOutcome> {
        self.inner.read().await.get(package).cloned()
    }

    /// Insert the final outcome for `package`
    ///
    /// Outcomes are immutable once stored; inserting the same package
    /// twice replaces the entry (workers never do — they check
    /// [`contains`](Self::contains) first).
    pub async fn insert(&self, package: String, outcome: ScanOutcome) {
        self.inner.write().await.insert(package, outcome);
    }

    /// Number of stored outcomes
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the store holds no outcomes
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Serialize the current state as pretty-printed JSON
    pub async fn serialize(&self) -> Result<Vec<u8>> {
        let state = self.inner.read().await;
        Ok(serde_json::to_vec_pretty(&*state)?)
    }

    /// Persist the current state to `path`, atomically
    ///
    /// The state is serialized under a read lock, written to a temporary
    /// file in the target directory, and renamed into place, so a crash
    /// mid-write never corrupts an existing checkpoint. Returns the number
    /// of packages persisted.
    ///
    /// # Errors
    ///
    /// [`Error::Checkpoint`] on any serialization or I/O failure — fatal
    /// to the run by policy.
    pub async fn snapshot(&self, path: &Path) -> Result<usize> {
        let (bytes, count) = {
            let state = self.inner.read().await;
            let bytes = serde_json::to_vec_pretty(&*state).map_err(|e| Error::Checkpoint {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            (bytes, state.len())
        };

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let write_atomically = || -> std::io::Result<()> {
            let mut file = tempfile::NamedTempFile::new_in(parent)?;
            file.write_all(&bytes)?;
            file.flush()?;
            file.persist(path).map_err(|e| e.error)?;
            Ok(())
        };
        write_atomically().map_err(|e| Error::Checkpoint {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!(path = %path.display(), packages = count, "snapshot written");
        Ok(count)
    }

    /// Replace the store's content with the state serialized in `bytes`
    pub async fn restore_from_slice(&self, bytes: &[u8]) -> Result<()> {
        let state: BTreeMap<String, ScanOutcome> = serde_json::from_slice(bytes)?;
        *self.inner.write().await = state;
        Ok(())
    }

    /// Restore state from `path` if the file exists
    ///
    /// Returns the number of outcomes loaded, zero when no checkpoint
    /// exists yet.
    pub async fn load_if_exists(&self, path: &Path) -> Result<usize> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                self.restore_from_slice(&bytes).await?;
                let count = self.len().await;
                debug!(path = %path.display(), packages = count, "restored checkpoint");
                Ok(count)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
