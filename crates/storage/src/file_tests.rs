// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn put_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(&dir.path().join("store.jsonl")).unwrap();

    store
        .put("connection", "url", Bytes::from_static(b"ws://localhost:7779/ws"))
        .await
        .unwrap();

    assert_eq!(
        store.get("connection", "url").await.unwrap(),
        Some(Bytes::from_static(b"ws://localhost:7779/ws"))
    );
    assert_eq!(store.get("connection", "other").await.unwrap(), None);
}

#[tokio::test]
async fn values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.jsonl");

    {
        let store = FileStore::open(&path).unwrap();
        store.put("connection", "url", Bytes::from_static(b"ws://a")).await.unwrap();
        store.put("connection", "url", Bytes::from_static(b"ws://b")).await.unwrap();
        store.put("logs", "1", Bytes::from_static(b"{}")).await.unwrap();
        store.close().unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.sequence(), 3);
    assert_eq!(
        store.get("connection", "url").await.unwrap(),
        Some(Bytes::from_static(b"ws://b"))
    );
    assert_eq!(store.keys("logs").await.unwrap(), ["1"]);
}

#[tokio::test]
async fn entries_store_values_as_base64_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.jsonl");
    let store = FileStore::open(&path).unwrap();

    store.put("connection", "url", Bytes::from_static(b"ws://a")).await.unwrap();
    store.close().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents,
        "{\"seq\":1,\"bucket\":\"connection\",\"key\":\"url\",\"value\":\"d3M6Ly9h\"}\n"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_puts_get_distinct_sequences() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.jsonl");
    let store = FileStore::open(&path).unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .put("logs", &format!("{i:02}"), Bytes::from(vec![i as u8]))
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.sequence(), 16);
    assert_eq!(store.keys("logs").await.unwrap().len(), 16);
    store.close().unwrap();

    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.sequence(), 16);
    assert_eq!(
        reopened.get("logs", "07").await.unwrap(),
        Some(Bytes::from(vec![7u8]))
    );
}

#[tokio::test]
async fn torn_last_line_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.jsonl");

    {
        let store = FileStore::open(&path).unwrap();
        store.put("connection", "url", Bytes::from_static(b"ws://a")).await.unwrap();
    }
    let mut file = OpenOptions::new().append(true).open(&path).unwrap();
    write!(file, "{{\"seq\":2,\"bucket\":\"conn").unwrap();

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.sequence(), 1);
    assert_eq!(
        store.get("connection", "url").await.unwrap(),
        Some(Bytes::from_static(b"ws://a"))
    );
}

#[tokio::test]
async fn put_after_close_fails_with_op_tag() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(&dir.path().join("store.jsonl")).unwrap();
    store.close().unwrap();

    let err = store
        .put("connection", "url", Bytes::from_static(b"x"))
        .await
        .unwrap_err();
    assert_eq!(err.op, StoreOp::Put);
    assert!(matches!(err.kind, StoreErrorKind::Closed));
    assert_eq!(err.to_string(), "store put: store is closed");
}

#[test]
fn open_in_unwritable_location_fails_with_open_tag() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"").unwrap();

    let err = FileStore::open(&blocker.join("store.jsonl")).err().unwrap();
    assert_eq!(err.op, StoreOp::Open);
}

#[test]
fn open_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/state/store.jsonl");
    let store = FileStore::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(store.path(), path);
    assert_eq!(store.sequence(), 0);
}
