// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted transport for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Dialer, FrameKind, TransportClient, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Recorded transport call. `client` numbers clients in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Dial { client: usize, url: String },
    Read { client: usize },
    Close { client: usize },
}

/// How the next dial behaves
#[derive(Debug, Clone)]
pub enum FakeDial {
    /// Dial fails with the given reason
    Refuse(String),
    /// Dial succeeds; `frames` are delivered first. Unless `hold_open`,
    /// the producer then closes the connection.
    Accept { frames: Vec<Vec<u8>>, hold_open: bool },
    /// Dial never completes until the client is closed
    Hang,
}

impl FakeDial {
    /// Accept and stay open with no initial frames
    pub fn open() -> Self {
        FakeDial::Accept {
            frames: Vec::new(),
            hold_open: true,
        }
    }
}

#[derive(Debug)]
enum FakeEvent {
    Frame(Vec<u8>),
    Drop(String),
}

#[derive(Debug)]
struct State {
    script: VecDeque<FakeDial>,
    fallback: FakeDial,
    calls: Vec<TransportCall>,
    clients: usize,
    active_reads: usize,
    max_concurrent_reads: usize,
    live: Option<(usize, mpsc::UnboundedSender<FakeEvent>)>,
}

/// Fake dialer handing out [`FakeTransport`]s that share one script
#[derive(Debug, Clone)]
pub struct FakeDialer {
    state: Arc<Mutex<State>>,
}

impl Default for FakeDialer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDialer {
    /// Every dial accepts and holds the connection open
    pub fn new() -> Self {
        Self::with_fallback(FakeDial::open())
    }

    /// Use `fallback` once the script runs out
    pub fn with_fallback(fallback: FakeDial) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                script: VecDeque::new(),
                fallback,
                calls: Vec::new(),
                clients: 0,
                active_reads: 0,
                max_concurrent_reads: 0,
                live: None,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue the behavior of the next unscripted dial
    pub fn push_dial(&self, dial: FakeDial) {
        self.lock().script.push_back(dial);
    }

    /// Deliver a frame on the live connection. Returns false if none is open.
    pub fn push_frame(&self, payload: impl Into<Vec<u8>>) -> bool {
        match &self.lock().live {
            Some((_, tx)) => tx.send(FakeEvent::Frame(payload.into())).is_ok(),
            None => false,
        }
    }

    /// Fail the live connection from the producer side
    pub fn drop_connection(&self, reason: &str) -> bool {
        match self.lock().live.take() {
            Some((_, tx)) => tx.send(FakeEvent::Drop(reason.to_string())).is_ok(),
            None => false,
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    pub fn dial_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, TransportCall::Dial { .. }))
            .count()
    }

    /// Reads currently blocked in any client
    pub fn active_reads(&self) -> usize {
        self.lock().active_reads
    }

    /// Highest number of reads ever in flight at once
    pub fn max_concurrent_reads(&self) -> usize {
        self.lock().max_concurrent_reads
    }

    /// Whether a connection is currently open
    pub fn is_live(&self) -> bool {
        self.lock().live.is_some()
    }
}

impl Dialer for FakeDialer {
    type Client = FakeTransport;

    fn client(&self) -> FakeTransport {
        let id = {
            let mut state = self.lock();
            state.clients += 1;
            state.clients
        };
        FakeTransport {
            id,
            dialer: self.clone(),
            connected: AtomicBool::new(false),
            inbound: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }
}

/// One scripted connection
#[derive(Debug)]
pub struct FakeTransport {
    id: usize,
    dialer: FakeDialer,
    connected: AtomicBool,
    inbound: Mutex<Option<mpsc::UnboundedReceiver<FakeEvent>>>,
    shutdown: CancellationToken,
}

impl FakeTransport {
    pub fn id(&self) -> usize {
        self.id
    }

    fn record(&self, call: TransportCall) {
        self.dialer.lock().calls.push(call);
    }
}

/// Tracks one in-flight read
struct ReadGuard<'a>(&'a FakeDialer);

impl<'a> ReadGuard<'a> {
    fn enter(dialer: &'a FakeDialer) -> Self {
        let mut state = dialer.lock();
        state.active_reads += 1;
        state.max_concurrent_reads = state.max_concurrent_reads.max(state.active_reads);
        ReadGuard(dialer)
    }
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().active_reads -= 1;
    }
}

#[async_trait]
impl TransportClient for FakeTransport {
    async fn dial(&self, url: &str) -> Result<(), TransportError> {
        self.record(TransportCall::Dial {
            client: self.id,
            url: url.to_string(),
        });
        if self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::AlreadyConnected);
        }
        if self.shutdown.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let plan = {
            let mut state = self.dialer.lock();
            match state.script.pop_front() {
                Some(plan) => plan,
                None => state.fallback.clone(),
            }
        };

        match plan {
            FakeDial::Refuse(reason) => Err(TransportError::Dial(reason)),
            FakeDial::Hang => {
                self.shutdown.cancelled().await;
                Err(TransportError::Cancelled)
            }
            FakeDial::Accept { frames, hold_open } => {
                let (tx, rx) = mpsc::unbounded_channel();
                for frame in frames {
                    let _ = tx.send(FakeEvent::Frame(frame));
                }
                if hold_open {
                    self.dialer.lock().live = Some((self.id, tx));
                } else {
                    let _ = tx.send(FakeEvent::Drop("remote closed".into()));
                }
                *self.inbound.lock().unwrap_or_else(|e| e.into_inner()) = Some(rx);
                self.connected.store(true, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn read(
        &self,
        on_frame: &mut (dyn for<'a> FnMut(FrameKind, &'a [u8]) + Send),
    ) -> TransportError {
        self.record(TransportCall::Read { client: self.id });
        let taken = self.inbound.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(mut rx) = taken else {
            if self.connected.load(Ordering::SeqCst) {
                return TransportError::Read("stream already consumed".into());
            }
            return TransportError::NilConnection;
        };

        let _guard = ReadGuard::enter(&self.dialer);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return TransportError::Cancelled,
                event = rx.recv() => match event {
                    Some(FakeEvent::Frame(payload)) => {
                        on_frame(FrameKind::Text, &payload);
                        tokio::task::yield_now().await;
                    }
                    Some(FakeEvent::Drop(reason)) => return TransportError::Read(reason),
                    None => return TransportError::Read("connection closed".into()),
                },
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.record(TransportCall::Close { client: self.id });
        self.shutdown.cancel();
        {
            let mut state = self.dialer.lock();
            if matches!(state.live, Some((id, _)) if id == self.id) {
                state.live = None;
            }
        }
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::NilConnection)
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
