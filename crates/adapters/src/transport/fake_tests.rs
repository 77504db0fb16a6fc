// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn collect(frames: &mut Vec<Vec<u8>>) -> impl FnMut(FrameKind, &[u8]) + Send + '_ {
    move |_, payload: &[u8]| frames.push(payload.to_vec())
}

#[tokio::test]
async fn scripted_frames_then_remote_close() {
    let dialer = FakeDialer::new();
    dialer.push_dial(FakeDial::Accept {
        frames: vec![b"a".to_vec(), b"b".to_vec()],
        hold_open: false,
    });

    let client = dialer.client();
    client.dial("ws://producer/ws").await.unwrap();

    let mut frames = Vec::new();
    let err = client.read(&mut collect(&mut frames)).await;

    assert!(matches!(err, TransportError::Read(_)));
    assert_eq!(frames, vec![b"a".to_vec(), b"b".to_vec()]);
    assert_eq!(dialer.active_reads(), 0);
    assert_eq!(dialer.max_concurrent_reads(), 1);
}

#[tokio::test]
async fn refused_dial() {
    let dialer = FakeDialer::with_fallback(FakeDial::Refuse("refused".into()));
    let client = dialer.client();

    let err = client.dial("ws://producer/ws").await.unwrap_err();
    assert!(matches!(err, TransportError::Dial(ref r) if r == "refused"));
    assert!(!dialer.is_live());
}

#[tokio::test]
async fn second_dial_is_rejected() {
    let dialer = FakeDialer::new();
    let client = dialer.client();
    client.dial("ws://producer/ws").await.unwrap();

    assert!(matches!(
        client.dial("ws://producer/ws").await,
        Err(TransportError::AlreadyConnected)
    ));
    assert_eq!(dialer.dial_count(), 2);
}

/// Reads through the trait object, lending each frame to a borrowing callback
async fn read_lengths(client: &dyn TransportClient) -> (Vec<usize>, TransportError) {
    let mut lengths = Vec::new();
    let err = client
        .read(&mut |_, payload: &[u8]| lengths.push(payload.len()))
        .await;
    (lengths, err)
}

#[tokio::test]
async fn read_through_trait_object() {
    let dialer = FakeDialer::new();
    dialer.push_dial(FakeDial::Accept {
        frames: vec![b"one".to_vec(), b"three".to_vec()],
        hold_open: false,
    });
    let client = dialer.client();
    client.dial("ws://producer/ws").await.unwrap();

    let (lengths, err) = read_lengths(&client).await;

    assert_eq!(lengths, vec![3, 5]);
    assert!(matches!(err, TransportError::Read(_)));
}

#[tokio::test]
async fn pushed_frames_reach_live_read() {
    let dialer = FakeDialer::new();
    let client = Arc::new(dialer.client());
    client.dial("ws://producer/ws").await.unwrap();

    let reader = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            let mut frames = Vec::new();
            let err = client.read(&mut collect(&mut frames)).await;
            (frames, err)
        })
    };

    assert!(dialer.push_frame("x"));
    assert!(dialer.push_frame("y"));
    assert!(dialer.drop_connection("gone"));

    let (frames, err) = reader.await.unwrap();
    assert_eq!(frames, vec![b"x".to_vec(), b"y".to_vec()]);
    assert!(matches!(err, TransportError::Read(ref r) if r == "gone"));
}

#[tokio::test]
async fn close_unblocks_read() {
    let dialer = FakeDialer::new();
    let client = Arc::new(dialer.client());
    client.dial("ws://producer/ws").await.unwrap();

    let reader = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.read(&mut |_, _: &[u8]| {}).await })
    };
    tokio::task::yield_now().await;

    client.close().await.unwrap();
    assert!(matches!(reader.await.unwrap(), TransportError::Cancelled));
    assert!(!dialer.is_live());
}

#[tokio::test]
async fn close_unblocks_hanging_dial() {
    let dialer = FakeDialer::with_fallback(FakeDial::Hang);
    let client = Arc::new(dialer.client());

    let dialing = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.dial("ws://producer/ws").await })
    };
    tokio::task::yield_now().await;

    assert!(matches!(
        client.close().await,
        Err(TransportError::NilConnection)
    ));
    assert!(matches!(
        dialing.await.unwrap(),
        Err(TransportError::Cancelled)
    ));
}

#[tokio::test]
async fn read_without_dial() {
    let dialer = FakeDialer::new();
    let client = dialer.client();
    let err = client.read(&mut |_, _: &[u8]| {}).await;
    assert!(matches!(err, TransportError::NilConnection));
}

#[tokio::test]
async fn calls_are_recorded_per_client() {
    let dialer = FakeDialer::new();
    let first = dialer.client();
    let second = dialer.client();
    first.dial("ws://a/ws").await.unwrap();
    second.dial("ws://b/ws").await.unwrap();
    first.close().await.unwrap();

    assert_eq!(
        dialer.calls(),
        vec![
            TransportCall::Dial {
                client: 1,
                url: "ws://a/ws".into()
            },
            TransportCall::Dial {
                client: 2,
                url: "ws://b/ws".into()
            },
            TransportCall::Close { client: 1 },
        ]
    );
    // Closing a stale client leaves the newer connection alone
    assert!(dialer.is_live());
}
