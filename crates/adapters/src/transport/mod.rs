// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duplex transport to the log producer
//!
//! A [`TransportClient`] owns at most one physical connection over its
//! whole lifetime. To reconnect, the caller asks its [`Dialer`] for a
//! fresh client and discards the old one.

mod ws;

pub use ws::{WsClient, WsConfig, WsDialer};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeDial, FakeDialer, FakeTransport, TransportCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection already established")]
    AlreadyConnected,
    #[error("nil connection")]
    NilConnection,
    #[error("dial failed: {0}")]
    Dial(String),
    #[error("read failed: {0}")]
    Read(String),
    #[error("close failed: {0}")]
    Close(String),
    #[error("connection closed locally")]
    Cancelled,
}

/// Kind of an application frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
}

/// One connection to the producer.
///
/// Calls are serialized by the owner, with one exception: `close` may run
/// while `read` is blocked and must make that `read` return.
#[async_trait]
pub trait TransportClient: Send + Sync + 'static {
    /// Open the connection. Fails with `AlreadyConnected` if this client
    /// has already connected.
    async fn dial(&self, url: &str) -> Result<(), TransportError>;

    /// Deliver every inbound application frame to `on_frame` until the
    /// connection fails or is closed, then return the cause. Never returns
    /// while the connection is alive, and a remote close is an error too.
    ///
    /// No further frame is read until `on_frame` returns.
    async fn read(
        &self,
        on_frame: &mut (dyn for<'a> FnMut(FrameKind, &'a [u8]) + Send),
    ) -> TransportError;

    /// Send a close notification and release the connection. Fails with
    /// `NilConnection` if the client never connected, but still unblocks
    /// any pending `dial` or `read`. Closing again after that is a no-op.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Produces fresh, unconnected clients
pub trait Dialer: Clone + Send + Sync + 'static {
    type Client: TransportClient;

    fn client(&self) -> Self::Client;
}
