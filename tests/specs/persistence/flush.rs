//! Persistence specs
//!
//! Verify that ingested records and the endpoint survive a restart.

use crate::prelude::*;
use logcrunch_core::{IdShape, Record, RecordId};
use logcrunch_engine::{
    log_key, Flusher, FlusherConfig, CONNECTION_BUCKET, LOGS_BUCKET, URL_KEY,
};
use logcrunch_storage::KvStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn ingested_records_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.jsonl");
    let store = FileStore::open(&path).unwrap();
    let mut producer = Producer::start().await;

    let ingest = Ingest::start(store.clone(), IdShape::Sniff, Duration::from_secs(3));
    let flush_shutdown = CancellationToken::new();
    let flusher = tokio::spawn(
        Flusher::open(
            store.clone(),
            Arc::clone(&ingest.buffer),
            FlusherConfig {
                interval: Duration::from_millis(50),
                batch: 2,
            },
        )
        .await
        .unwrap()
        .run(flush_shutdown.clone()),
    );

    ingest.handle.set_url(producer.url()).await.unwrap();
    let mut conn = producer.accept().await;
    for i in 0..5 {
        conn.send(record(&format!("r{i}"), "persist me")).await;
    }
    ingest.wait_for_records(5).await;

    let buffer = ingest.stop().await;
    flush_shutdown.cancel();
    flusher.await.unwrap();
    store.close().unwrap();

    // Persistence never consumed the live-tail cursor
    assert_eq!(buffer.read_unread(10).len(), 5);

    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(
        reopened.keys(LOGS_BUCKET).await.unwrap(),
        (0..5).map(log_key).collect::<Vec<_>>()
    );
    let saved = reopened.get(LOGS_BUCKET, &log_key(3)).await.unwrap().unwrap();
    let saved = Record::decode(&saved).unwrap();
    assert_eq!(saved.id(), &RecordId::opaque("r3"));
    assert_eq!(saved.message(), "persist me");

    let url = reopened.get(CONNECTION_BUCKET, URL_KEY).await.unwrap().unwrap();
    assert_eq!(&url[..], producer.url().as_bytes());
}
