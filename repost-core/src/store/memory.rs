//! In-memory record store
//!
//! Readers clone the current `Arc` and iterate it without holding the
//! lock. A writer builds the next generation with `Arc::make_mut` and swaps
//! it in, so a snapshot handed out earlier is never mutated.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{InsertOutcome, RecordSnapshot, RecordStore, StoreBackend, StoreError};
use crate::record::Record;

#[derive(Default)]
struct Generation {
    /// Sorted by `Record::sort_key`
    records: Arc<Vec<Record>>,
    identities: HashSet<String>,
}

/// Volatile record store (development and tests).
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Generation>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned<T>(_: T) -> StoreError {
        StoreError::Unavailable("memory store lock poisoned".into())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: Record) -> Result<InsertOutcome, StoreError> {
        let mut generation = self.inner.write().map_err(Self::poisoned)?;
        if generation.identities.contains(&record.identity) {
            return Ok(InsertOutcome::AlreadyPresent);
        }

        generation.identities.insert(record.identity.clone());
        let records = Arc::make_mut(&mut generation.records);
        let at = records.partition_point(|r| r.sort_key() <= record.sort_key());
        tracing::debug!(identity = %record.identity, "Stored record in memory");
        records.insert(at, record);
        Ok(InsertOutcome::Inserted)
    }

    async fn get(&self, identity: &str) -> Result<Option<Record>, StoreError> {
        let records = self.inner.read().map_err(Self::poisoned)?.records.clone();
        Ok(records.iter().find(|r| r.identity == identity).cloned())
    }

    async fn all(&self) -> Result<RecordSnapshot, StoreError> {
        let records = self.inner.read().map_err(Self::poisoned)?.records.clone();
        Ok(RecordSnapshot::from_sorted(records))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().map_err(Self::poisoned)?.records.len())
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        let _generation = self.inner.read().map_err(Self::poisoned)?;
        Ok(())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}
