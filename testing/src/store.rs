//! In-memory match store for testing.
//!
//! Keeps every match record in a `HashMap` behind a lock and applies the
//! same version check a durable store would, so conflict handling can be
//! exercised without a database.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use crease_core::ids::MatchId;
use crease_core::store::{MatchRecord, MatchStore, StoreError};
use std::collections::HashMap;
use std::future::{Future, ready};
use std::pin::Pin;
use std::sync::{Arc, RwLock};

type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// In-memory, version-checked [`MatchStore`].
///
/// # Example
///
/// ```
/// use crease_testing::InMemoryMatchStore;
///
/// let store = InMemoryMatchStore::new();
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryMatchStore {
    records: Arc<RwLock<HashMap<MatchId, MatchRecord>>>,
}

impl InMemoryMatchStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of matches stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// True if no match is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.records.write().unwrap().clear();
    }

    /// Current version of a match, if stored.
    #[must_use]
    pub fn version(&self, match_id: &MatchId) -> Option<u64> {
        self.records.read().unwrap().get(match_id).map(|record| record.version)
    }

    /// Snapshot of a stored record.
    #[must_use]
    pub fn snapshot(&self, match_id: &MatchId) -> Option<MatchRecord> {
        self.records.read().unwrap().get(match_id).cloned()
    }

    /// Bump a record's version without changing it, as a competing writer
    /// committing between someone else's load and commit would.
    pub fn simulate_concurrent_write(&self, match_id: &MatchId) {
        if let Some(record) = self.records.write().unwrap().get_mut(match_id) {
            record.version += 1;
        }
    }

    fn create_now(&self, mut record: MatchRecord) -> Result<u64, StoreError> {
        let mut records = self.records.write().unwrap();
        let match_id = record.match_id().clone();
        if records.contains_key(&match_id) {
            return Err(StoreError::AlreadyExists(match_id));
        }
        record.version = 1;
        records.insert(match_id, record);
        Ok(1)
    }

    fn load_now(&self, match_id: &MatchId) -> Result<MatchRecord, StoreError> {
        self.records
            .read()
            .unwrap()
            .get(match_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(match_id.clone()))
    }

    fn commit_now(&self, mut record: MatchRecord) -> Result<u64, StoreError> {
        let mut records = self.records.write().unwrap();
        let match_id = record.match_id().clone();
        let Some(current) = records.get_mut(&match_id) else {
            return Err(StoreError::NotFound(match_id));
        };
        if current.version != record.version {
            return Err(StoreError::VersionConflict {
                match_id,
                expected: record.version,
                actual: current.version,
            });
        }
        record.version += 1;
        let version = record.version;
        *current = record;
        Ok(version)
    }
}

impl MatchStore for InMemoryMatchStore {
    fn create(&self, record: MatchRecord) -> StoreFuture<'_, u64> {
        Box::pin(ready(self.create_now(record)))
    }

    fn load(&self, match_id: MatchId) -> StoreFuture<'_, MatchRecord> {
        Box::pin(ready(self.load_now(&match_id)))
    }

    fn commit(&self, record: MatchRecord) -> StoreFuture<'_, u64> {
        Box::pin(ready(self.commit_now(record)))
    }
}
