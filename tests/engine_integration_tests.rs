//! Integration Tests for the Engine over a File Store
//!
//! Exercises the full set/get/evict/reload cycle against real snapshot files.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use snapcache::cache::{wall_clock_now, CREATED_AT_FORMAT};
use snapcache::{
    CacheEngine, CacheEntrySnapshot, CacheError, CacheEvent, CacheStore, FileCacheStore,
};
use tokio::sync::broadcast;

// == Helper Functions ==

async fn open_file_engine(path: &Path, ttl: u64) -> CacheEngine {
    CacheEngine::open(Arc::new(FileCacheStore::new(path)), ttl)
        .await
        .unwrap()
}

fn read_snapshot(path: &Path) -> Vec<CacheEntrySnapshot> {
    FileCacheStore::new(path).load().unwrap()
}

async fn next_event(events: &mut broadcast::Receiver<CacheEvent>) -> CacheEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for cache event")
        .expect("event channel closed")
}

/// Waits until `key` is evicted and the save that follows it completes.
async fn wait_for_eviction_save(events: &mut broadcast::Receiver<CacheEvent>, key: &str) {
    loop {
        if let CacheEvent::Evicted { key: evicted } = next_event(events).await {
            if evicted == key {
                break;
            }
        }
    }
    assert!(matches!(
        next_event(events).await,
        CacheEvent::Persisted { .. }
    ));
}

// == Scenarios ==

#[tokio::test]
async fn test_unaccessed_entry_expires_from_memory_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cachesData.data");
    let engine = open_file_engine(&path, 1).await;
    let mut events = engine.subscribe();

    engine.set("a", "1").await.unwrap();
    assert_eq!(engine.get("a").await.as_deref(), Some("1"));
    assert_eq!(read_snapshot(&path).len(), 1);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(engine.get("a").await, None);

    wait_for_eviction_save(&mut events, "a").await;
    assert!(read_snapshot(&path).iter().all(|e| e.key != "a"));
}

#[tokio::test]
async fn test_overwrite_leaves_single_entry_in_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cachesData.data");
    let engine = open_file_engine(&path, 10).await;

    engine.set("a", "1").await.unwrap();
    engine.set("a", "2").await.unwrap();

    assert_eq!(engine.get("a").await.as_deref(), Some("2"));
    let saved = read_snapshot(&path);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].key, "a");
    assert_eq!(saved[0].value, "2");
    assert_eq!(saved[0].ttl_seconds, 10);
}

#[tokio::test]
async fn test_entries_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cachesData.data");

    {
        let engine = open_file_engine(&path, 60).await;
        engine.set("user", "alice").await.unwrap();
        engine.set_with_ttl("session", "xyz", 600).await.unwrap();
    }

    let reopened = open_file_engine(&path, 60).await;
    assert_eq!(reopened.get("user").await.as_deref(), Some("alice"));
    assert_eq!(reopened.get("session").await.as_deref(), Some("xyz"));

    let data = reopened.caching_data().await;
    let session = data.iter().find(|e| e.key == "session").unwrap();
    assert_eq!(session.ttl_seconds, 600);
}

#[tokio::test]
async fn test_restart_discards_expired_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cachesData.data");
    let now = wall_clock_now();
    let stale = (now - TimeDelta::try_minutes(5).unwrap()).format(CREATED_AT_FORMAT);
    let fresh = now.format(CREATED_AT_FORMAT);
    fs::write(
        &path,
        format!(
            r#"[
  {{"key": "old", "value": "gone", "createdAt": "{stale}", "ttlSeconds": 10}},
  {{"key": "new", "value": "here", "createdAt": "{fresh}", "ttlSeconds": 120}}
]"#
        ),
    )
    .unwrap();

    let engine = open_file_engine(&path, 10).await;

    assert_eq!(engine.get("old").await, None);
    assert_eq!(engine.get("new").await.as_deref(), Some("here"));

    // The next save drops the discarded entry from disk
    engine.set("other", "x").await.unwrap();
    let keys: Vec<String> = read_snapshot(&path).into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec!["new".to_string(), "other".to_string()]);
}

#[tokio::test]
async fn test_empty_file_opens_empty_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cachesData.data");
    fs::write(&path, "").unwrap();

    let engine = open_file_engine(&path, 10).await;

    assert!(engine.is_empty().await);
}

#[tokio::test]
async fn test_corrupt_file_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cachesData.data");
    fs::write(&path, "not json at all").unwrap();

    let result = CacheEngine::open(Arc::new(FileCacheStore::new(&path)), 10).await;

    assert!(matches!(result, Err(CacheError::StoreUnavailable(_))));
    // The unreadable snapshot is left for inspection
    assert_eq!(fs::read_to_string(&path).unwrap(), "not json at all");
}

#[tokio::test]
async fn test_unwritable_location_keeps_serving_from_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("cachesData.data");
    let engine = open_file_engine(&path, 10).await;

    let result = engine.set("a", "1").await;

    assert!(matches!(result, Err(CacheError::StoreUnavailable(_))));
    assert_eq!(engine.get("a").await.as_deref(), Some("1"));
    assert_eq!(engine.stats().await.persist_failures, 1);
}

#[tokio::test]
async fn test_read_access_keeps_entry_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cachesData.data");
    let engine = open_file_engine(&path, 2).await;

    engine.set("hot", "1").await.unwrap();
    engine.set("cold", "2").await.unwrap();
    let mut events = engine.subscribe();

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(engine.get("hot").await.as_deref(), Some("1"));

    wait_for_eviction_save(&mut events, "cold").await;

    assert_eq!(engine.get("hot").await.as_deref(), Some("1"));
    let keys: Vec<String> = read_snapshot(&path).into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec!["hot".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_converge_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cachesData.data");
    let engine = open_file_engine(&path, 60).await;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.set(format!("k{}", i), i.to_string()).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let saved = read_snapshot(&path);
    assert_eq!(saved.len(), 16);
    for i in 0..16 {
        assert_eq!(engine.get(&format!("k{}", i)).await, Some(i.to_string()));
    }
}
