//! Integration tests for the SQLite record store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use repost_core::store::SqliteRecordStore;
use repost_core::{
    open_store, Candidate, DuplicateIndex, Engine, EngineConfig, Fingerprint, InsertOutcome,
    MatcherConfig, MockFingerprintSource, Record, RecordStore, StoreBackend, StoreError,
};

fn record(id: &str, fingerprint: &str, t: i64) -> Record {
    Record {
        identity: id.into(),
        content_locator: format!("https://i.redd.it/{id}.jpg"),
        fingerprint: Fingerprint::parse(fingerprint).unwrap(),
        title: format!("Post {id}"),
        origin: "r/pics".into(),
        author: "someone".into(),
        external_link: format!("https://reddit.com/r/pics/comments/{id}/"),
        posted_at: Some(Utc.timestamp_millis_opt(t - 1000).unwrap()),
        observed_at: Utc.timestamp_millis_opt(t).unwrap(),
    }
}

async fn open(dir: &TempDir) -> SqliteRecordStore {
    let path = dir.path().join("records.db");
    let store = SqliteRecordStore::open(path.to_str().unwrap()).await.unwrap();
    store.migrate().await.unwrap();
    store
}

#[tokio::test]
async fn test_insert_get_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir).await;

    let original = record("p1", "1010101010", 1_700_000_000_123);
    assert_eq!(
        store.insert(original.clone()).await.unwrap(),
        InsertOutcome::Inserted
    );

    let loaded = store.get("p1").await.unwrap().unwrap();
    assert_eq!(loaded, original);
    assert!(store.get("missing").await.unwrap().is_none());
    assert_eq!(store.backend(), StoreBackend::Sqlite);
}

#[tokio::test]
async fn test_duplicate_identity_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir).await;

    store.insert(record("p1", "1010", 1_000)).await.unwrap();
    let outcome = store.insert(record("p1", "0101", 2_000)).await.unwrap();

    assert_eq!(outcome, InsertOutcome::AlreadyPresent);
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(
        store.get("p1").await.unwrap().unwrap().fingerprint.as_str(),
        "1010"
    );
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = open(&dir).await;
        store.insert(record("p1", "1010", 1_000)).await.unwrap();
        store.insert(record("p2", "1011", 2_000)).await.unwrap();
        store.close().await;
    }

    let store = open(&dir).await;
    assert_eq!(store.count().await.unwrap(), 2);

    let index = DuplicateIndex::new(Arc::new(store), MatcherConfig::default());
    let result = index.get_match("p2").await.unwrap().unwrap();
    assert!(result.is_duplicate);
    assert_eq!(result.matches[0].identity, "p1");
}

#[tokio::test]
async fn test_snapshot_order_and_isolation() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir).await;

    store.insert(record("late", "1", 3_000)).await.unwrap();
    store.insert(record("early", "1", 1_000)).await.unwrap();

    let snapshot = store.all().await.unwrap();
    store.insert(record("mid", "1", 2_000)).await.unwrap();

    let ids: Vec<_> = snapshot.iter().map(|r| r.identity.as_str()).collect();
    assert_eq!(ids, vec!["early", "late"]);

    let ids: Vec<_> = store
        .all()
        .await
        .unwrap()
        .iter()
        .map(|r| r.identity.clone())
        .collect();
    assert_eq!(ids, vec!["early", "mid", "late"]);
}

#[tokio::test]
async fn test_open_store_accepts_sqlite_url() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("via-url.db").display());

    let store = open_store(Some(&url)).await.unwrap();
    store.insert(record("p1", "1010", 1_000)).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
    assert!(store.check_health().await.is_ok());
}

#[tokio::test]
async fn test_engine_shutdown_closes_store() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn RecordStore> = Arc::new(open(&dir).await);
    let mut config = EngineConfig::default();
    config.scheduler.cooldown = Duration::ZERO;
    let engine = Engine::with_parts(
        config,
        store.clone(),
        Arc::new(MockFingerprintSource::default()),
    );

    engine
        .scheduler
        .enqueue(vec![Candidate::new("p1", "https://i.redd.it/p1.jpg")])
        .await
        .unwrap();
    engine.scheduler.wait_until_idle().await.unwrap();
    engine.shutdown().await;

    assert!(matches!(
        store.check_health().await,
        Err(StoreError::Connection(_))
    ));

    let reopened = open(&dir).await;
    assert!(reopened.get("p1").await.unwrap().is_some());
}
