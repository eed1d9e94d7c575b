//! Record store module
//!
//! The durable source of truth: identity → [`Record`]. Two backends:
//! - **SQLite** ([`SqliteRecordStore`]): persisted, an insert is on disk
//!   when it returns.
//! - **Memory** ([`MemoryRecordStore`]): copy-on-write snapshot behind a
//!   lock, lost on restart (development and tests).
//!
//! The store is append-only. Inserting an identity that already exists is
//! an idempotent no-op reported as [`InsertOutcome::AlreadyPresent`].

pub mod error;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::record::Record;

/// Result of [`RecordStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOutcome {
    Inserted,
    /// The identity was already stored; nothing changed
    AlreadyPresent,
}

/// Which backend a store is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

impl StoreBackend {
    pub fn is_persistent(self) -> bool {
        matches!(self, Self::Sqlite)
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// An immutable, point-in-time view of every record.
///
/// Ordered by `observed_at`, then identity. Cloning is cheap and iteration
/// can be restarted any number of times; inserts that land after the
/// snapshot was taken are never visible through it.
#[derive(Debug, Clone, Default)]
pub struct RecordSnapshot(Arc<Vec<Record>>);

impl RecordSnapshot {
    /// Build a snapshot, sorting into canonical order.
    pub fn new(mut records: Vec<Record>) -> Self {
        records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self(Arc::new(records))
    }

    pub(crate) fn from_sorted(records: Arc<Vec<Record>>) -> Self {
        Self(records)
    }

    pub fn get(&self, identity: &str) -> Option<&Record> {
        self.0.iter().find(|r| r.identity == identity)
    }

    pub fn to_vec(&self) -> Vec<Record> {
        self.0.to_vec()
    }
}

impl Deref for RecordSnapshot {
    type Target = [Record];

    fn deref(&self) -> &[Record] {
        self.0.as_slice()
    }
}

impl<'a> IntoIterator for &'a RecordSnapshot {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Durable identity → record mapping.
///
/// Implementations must tolerate concurrent readers while a write is in
/// progress; a reader never observes a partially written record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append a record. A duplicate identity leaves the store unchanged.
    async fn insert(&self, record: Record) -> Result<InsertOutcome, StoreError>;

    /// Look up a record; `None` for unknown identities.
    async fn get(&self, identity: &str) -> Result<Option<Record>, StoreError>;

    /// Consistent snapshot of every record.
    async fn all(&self) -> Result<RecordSnapshot, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Check backend health (always Ok for memory backend)
    async fn check_health(&self) -> Result<(), StoreError>;

    /// Release backend resources. The store is not used afterwards.
    async fn close(&self) {}

    fn backend(&self) -> StoreBackend;
}

/// Open the store for a database URL, or an in-memory store without one.
///
/// Accepts `sqlite:` URLs and bare file paths.
pub async fn open_store(database_url: Option<&str>) -> Result<Arc<dyn RecordStore>, StoreError> {
    match database_url.map(str::trim) {
        Some(url) if !url.is_empty() => {
            tracing::info!("Using SQLite record storage");
            let store = SqliteRecordStore::open(url).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        _ => {
            tracing::warn!("Using in-memory record storage - records will be lost on restart!");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, t: i64) -> Record {
        Record {
            identity: id.into(),
            content_locator: "loc".into(),
            fingerprint: Fingerprint::parse("1010").unwrap(),
            title: String::new(),
            origin: String::new(),
            author: String::new(),
            external_link: String::new(),
            posted_at: None,
            observed_at: Utc.timestamp_millis_opt(t).unwrap(),
        }
    }

    #[test]
    fn test_snapshot_sorts_by_time_then_identity() {
        let snapshot = RecordSnapshot::new(vec![record("b", 2), record("c", 1), record("a", 2)]);
        let ids: Vec<_> = snapshot.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(snapshot.get("a").map(|r| r.identity.as_str()), Some("a"));
        assert!(snapshot.get("z").is_none());
    }

    #[test]
    fn test_snapshot_is_restartable() {
        let snapshot = RecordSnapshot::new(vec![record("a", 1), record("b", 2)]);
        assert_eq!((&snapshot).into_iter().count(), 2);
        assert_eq!((&snapshot).into_iter().count(), 2);
    }

    #[tokio::test]
    async fn test_open_store_without_url_is_memory() {
        let store = open_store(None).await.unwrap();
        assert_eq!(store.backend(), StoreBackend::Memory);
        let store = open_store(Some("  ")).await.unwrap();
        assert!(!store.backend().is_persistent());
    }

    #[tokio::test]
    async fn test_open_store_with_path_is_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let store = open_store(path.to_str()).await.unwrap();
        assert_eq!(store.backend(), StoreBackend::Sqlite);
        assert!(store.check_health().await.is_ok());
    }
}
