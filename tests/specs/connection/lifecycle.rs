//! Connection lifecycle specs
//!
//! Verify connect, reconnect, endpoint switching and shutdown against a
//! real websocket producer.

use crate::prelude::*;
use logcrunch_core::{ConnectionStatus, IdShape};
use std::time::Duration;

#[tokio::test]
async fn set_url_connects_to_producer() {
    let mut producer = Producer::start().await;
    let ingest = Ingest::start(MemoryStore::new(), IdShape::Sniff, Duration::from_secs(3));

    ingest.handle.set_url(producer.url()).await.unwrap();
    let _conn = producer.accept().await;

    ingest.wait_for_status(ConnectionStatus::Connected).await;
    assert_eq!(ingest.handle.get_url(), producer.url());
    ingest.stop().await;
}

#[tokio::test]
async fn reconnects_after_producer_closes() {
    let mut producer = Producer::start().await;
    let ingest = Ingest::start(MemoryStore::new(), IdShape::Sniff, Duration::from_millis(200));
    ingest.handle.set_url(producer.url()).await.unwrap();

    let mut conn = producer.accept().await;
    conn.send(record("1", "before")).await;
    ingest.wait_for_records(1).await;
    conn.close().await;

    let mut conn = producer.accept().await;
    ingest.wait_for_status(ConnectionStatus::Connected).await;
    conn.send(record("2", "after")).await;
    ingest.wait_for_records(2).await;

    let buffer = ingest.stop().await;
    let messages: Vec<_> = buffer
        .read_unread(10)
        .iter()
        .map(|r| r.message().to_string())
        .collect();
    assert_eq!(messages, vec!["before", "after"]);
}

#[tokio::test]
async fn set_url_moves_to_new_producer() {
    let mut first = Producer::start().await;
    let mut second = Producer::start().await;
    let ingest = Ingest::start(MemoryStore::new(), IdShape::Sniff, Duration::from_secs(3));

    ingest.handle.set_url(first.url()).await.unwrap();
    let mut old = first.accept().await;
    ingest.wait_for_status(ConnectionStatus::Connected).await;

    ingest.handle.set_url(second.url()).await.unwrap();
    let mut new = second.accept().await;

    assert!(old.closed_by_client().await, "old connection must be closed");
    new.send(record("n", "from second")).await;
    ingest.wait_for_records(1).await;
    assert_eq!(ingest.buffer.read_unread(10)[0].message(), "from second");
    ingest.stop().await;
}

#[tokio::test]
async fn unreachable_producer_reports_error() {
    // Bind then drop to find a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}/logs", listener.local_addr().unwrap());
    drop(listener);

    let ingest = Ingest::start(MemoryStore::new(), IdShape::Sniff, Duration::from_secs(30));
    ingest.handle.set_url(&url).await.unwrap();

    ingest.wait_for_status(ConnectionStatus::Error).await;
    ingest.stop().await;
}

#[tokio::test]
async fn shutdown_closes_connection_and_reports_disconnected() {
    let mut producer = Producer::start().await;
    let ingest = Ingest::start(MemoryStore::new(), IdShape::Sniff, Duration::from_millis(100));
    ingest.handle.set_url(producer.url()).await.unwrap();
    let mut conn = producer.accept().await;
    ingest.wait_for_status(ConnectionStatus::Connected).await;

    let handle = ingest.handle.clone();
    ingest.stop().await;

    assert!(conn.closed_by_client().await);
    assert_eq!(handle.get_status(), ConnectionStatus::Disconnected);
    assert!(
        !producer.connects_within(Duration::from_millis(500)).await,
        "no reconnect after shutdown"
    );
}

#[tokio::test]
async fn connect_once_uses_loaded_url() {
    let mut producer = Producer::start().await;
    let store = MemoryStore::new();
    {
        let ingest = Ingest::start(store.clone(), IdShape::Sniff, Duration::from_secs(3));
        ingest.handle.set_url(producer.url()).await.unwrap();
        let _conn = producer.accept().await;
        ingest.stop().await;
    }

    let ingest = Ingest::start(store, IdShape::Sniff, Duration::from_secs(3));
    assert_eq!(ingest.handle.load_url().await.unwrap().as_deref(), Some(producer.url()));
    ingest.handle.connect_once();
    ingest.handle.connect_once();

    let _conn = producer.accept().await;
    ingest.wait_for_status(ConnectionStatus::Connected).await;
    assert!(!producer.connects_within(Duration::from_millis(300)).await);
    ingest.stop().await;
}
