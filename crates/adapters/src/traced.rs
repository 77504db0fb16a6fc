// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::transport::{Dialer, FrameKind, TransportClient, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Wrapper that adds tracing to every client a [`Dialer`] creates
#[derive(Clone)]
pub struct TracedDialer<D> {
    inner: D,
    next_client: Arc<AtomicU64>,
}

impl<D> TracedDialer<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            next_client: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl<D: Dialer> Dialer for TracedDialer<D> {
    type Client = TracedTransport<D::Client>;

    fn client(&self) -> Self::Client {
        let client = self.next_client.fetch_add(1, Ordering::Relaxed);
        TracedTransport::new(self.inner.client(), client)
    }
}

/// Wrapper that adds tracing to any TransportClient
pub struct TracedTransport<C> {
    inner: C,
    client: u64,
}

impl<C> TracedTransport<C> {
    pub fn new(inner: C, client: u64) -> Self {
        Self { inner, client }
    }
}

#[async_trait]
impl<C: TransportClient> TransportClient for TracedTransport<C> {
    async fn dial(&self, url: &str) -> Result<(), TransportError> {
        let span = tracing::info_span!("transport.dial", client = self.client, url);
        async {
            tracing::info!("connecting");

            // Precondition: only websocket schemes are dialable
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                tracing::error!("unsupported url scheme");
                return Err(TransportError::Dial(format!(
                    "unsupported url scheme: {url}"
                )));
            }

            let start = Instant::now();
            let result = self.inner.dial(url).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "connected"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "dial failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn read(
        &self,
        on_frame: &mut (dyn for<'a> FnMut(FrameKind, &'a [u8]) + Send),
    ) -> TransportError {
        let span = tracing::info_span!("transport.read", client = self.client);
        async {
            tracing::debug!("reading");

            let start = Instant::now();
            let mut frames = 0u64;
            let err = {
                let mut counting = |kind: FrameKind, payload: &[u8]| {
                    frames += 1;
                    tracing::trace!(?kind, len = payload.len(), "frame");
                    on_frame(kind, payload);
                };
                self.inner.read(&mut counting).await
            };

            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &err {
                // Local close is the normal way a read ends
                TransportError::Cancelled => {
                    tracing::info!(frames, elapsed_ms, "read stopped")
                }
                e => tracing::warn!(frames, elapsed_ms, error = %e, "read ended"),
            }
            err
        }
        .instrument(span)
        .await
    }

    async fn close(&self) -> Result<(), TransportError> {
        let span = tracing::info_span!("transport.close", client = self.client);
        async {
            let result = self.inner.close().await;
            // close() failing is often acceptable (never connected, peer gone)
            match &result {
                Ok(()) => tracing::info!("closed"),
                Err(e) => tracing::warn!(error = %e, "close failed (may be expected)"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
