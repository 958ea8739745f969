// tests/dedup_persistence.rs
use sov_herald::dedup::{SeenRecord, SeenStore};

fn record(id: u64) -> SeenRecord {
    SeenRecord {
        id,
        type_id: 45,
        sent_date: "2014-05-01 10:08:00".to_string(),
        sender_id: 1000,
    }
}

#[tokio::test]
async fn seen_ids_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seen.sqlite");

    {
        let store = SeenStore::open(&path).await.unwrap();
        assert!(store.is_new(42).await.unwrap());
        store.record_seen(record(42)).await.unwrap();
        assert!(!store.is_new(42).await.unwrap());
    }

    // Fresh connection over the same file: the announcement is still there.
    let reopened = SeenStore::open(&path).await.unwrap();
    assert!(!reopened.is_new(42).await.unwrap());
    assert!(reopened.is_new(43).await.unwrap());
}

#[tokio::test]
async fn recording_is_idempotent_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seen.sqlite");

    let store = SeenStore::open(&path).await.unwrap();
    store.record_seen(record(7)).await.unwrap();

    let second = SeenStore::open(&path).await.unwrap();
    second.record_seen(record(7)).await.unwrap();
    assert!(!second.is_new(7).await.unwrap());
}
