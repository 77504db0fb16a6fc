//! Record ingestion specs
//!
//! Verify what reaches the buffer for well-formed, malformed and
//! oversized frames.

use crate::prelude::*;
use logcrunch_adapters::WsConfig;
use logcrunch_core::{ConnectionStatus, IdShape, RecordId, RecordKind, Scalar};
use std::time::Duration;

#[tokio::test]
async fn records_arrive_in_order_and_bad_frames_are_skipped() {
    let mut producer = Producer::start().await;
    let ingest = Ingest::start(MemoryStore::new(), IdShape::Sniff, Duration::from_secs(3));
    ingest.handle.set_url(producer.url()).await.unwrap();
    let mut conn = producer.accept().await;

    conn.send(record("a", "first")).await;
    conn.send("{not json").await;
    conn.send_binary(record("b", "second").into_bytes()).await;
    conn.send(r#"{"message": "no id"}"#).await;
    conn.send(record("c", "third")).await;

    ingest.wait_for_records(3).await;
    // The connection survives malformed input
    assert_eq!(ingest.handle.get_status(), ConnectionStatus::Connected);

    let buffer = ingest.stop().await;
    let ids: Vec<_> = buffer.read_unread(10).iter().map(|r| r.id().clone()).collect();
    assert_eq!(
        ids,
        vec![
            RecordId::opaque("a"),
            RecordId::opaque("b"),
            RecordId::opaque("c")
        ]
    );
}

#[tokio::test]
async fn structured_records_are_indexed() {
    let mut producer = Producer::start().await;
    let ingest = Ingest::start(MemoryStore::new(), IdShape::Structured, Duration::from_secs(3));
    ingest.handle.set_url(producer.url()).await.unwrap();
    let mut conn = producer.accept().await;

    conn.send(record("opaque", "rejected by shape")).await;
    conn.send(structured_record("svc", 9)).await;
    ingest.wait_for_records(1).await;

    let buffer = ingest.stop().await;
    let records = buffer.read_unread(10);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.id(), &RecordId::structured("svc", 9));
    assert_eq!(record.kind(), RecordKind::Metric);
    assert_eq!(record.get("attrs.http.status"), Some(&Scalar::Number(200.0)));
    assert_eq!(record.get("source_file"), Some(&Scalar::from("")));
}

#[tokio::test]
async fn oversized_frame_drops_connection_then_reconnects() {
    let mut producer = Producer::start().await;
    let transport = WsConfig {
        max_frame_size: 1024,
        ..WsConfig::default()
    };
    let ingest = Ingest::start_with(
        MemoryStore::new(),
        IdShape::Sniff,
        Duration::from_millis(100),
        transport,
    );
    ingest.handle.set_url(producer.url()).await.unwrap();

    let mut conn = producer.accept().await;
    conn.send(record("big", &"x".repeat(4096))).await;

    let mut conn = producer.accept().await;
    conn.send(record("small", "fits")).await;
    ingest.wait_for_records(1).await;

    let buffer = ingest.stop().await;
    let records = buffer.read_unread(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message(), "fits");
}
