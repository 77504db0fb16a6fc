// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection supervisor
//!
//! One control task owns the connection lifecycle. It reacts to four
//! events: shutdown, an explicit (re)connect trigger, the active attempt
//! finishing, and the reconnect timer firing. At most one attempt (dial
//! plus read loop) exists at a time; a trigger closes the current attempt
//! and waits for it to unwind before dialing again.

use crate::error::SupervisorError;
use crate::ingest::ingest;
use bytes::Bytes;
use logcrunch_adapters::{Dialer, TransportClient, TransportError};
use logcrunch_core::{ConnectionStatus, LogBuffer, RecordDecoder, StatusCell};
use logcrunch_storage::KvStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Bucket holding connection settings
pub const CONNECTION_BUCKET: &str = "connection";
/// Key of the endpoint URL inside [`CONNECTION_BUCKET`]
pub const URL_KEY: &str = "url";

/// Supervisor timing
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Wait between an attempt ending and the next automatic dial
    pub reconnect_delay: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
        }
    }
}

/// Status and URL read together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub status: ConnectionStatus,
    pub url: String,
}

#[derive(Debug, Default)]
struct Settings {
    url: String,
    connect_requested: bool,
}

#[derive(Debug)]
struct Shared {
    status: StatusCell,
    settings: Mutex<Settings>,
    /// Serializes set_url so the persisted and in-memory URL agree
    writes: tokio::sync::Mutex<()>,
    trigger: mpsc::Sender<()>,
}

impl Shared {
    fn settings(&self) -> std::sync::MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Request a (re)connect. Triggers coalesce while one is pending.
    fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }
}

/// Caller-facing side of the supervisor
#[derive(Debug, Clone)]
pub struct SupervisorHandle<S> {
    shared: Arc<Shared>,
    store: S,
}

impl<S: KvStore> SupervisorHandle<S> {
    pub fn get_status(&self) -> ConnectionStatus {
        self.shared.status.load()
    }

    pub fn get_url(&self) -> String {
        self.shared.settings().url.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        let settings = self.shared.settings();
        Snapshot {
            status: self.shared.status.load(),
            url: settings.url.clone(),
        }
    }

    /// Persist `url`, make it current and reconnect to it.
    ///
    /// If persisting fails the previous URL stays in effect and no
    /// reconnect happens.
    pub async fn set_url(&self, url: &str) -> Result<(), SupervisorError> {
        let _write = self.shared.writes.lock().await;

        if let Err(source) = self
            .store
            .put(CONNECTION_BUCKET, URL_KEY, Bytes::copy_from_slice(url.as_bytes()))
            .await
        {
            let current = self.get_url();
            tracing::error!(url, current = %current, error = %source, "failed to persist url");
            return Err(SupervisorError::Persist {
                url: current,
                source,
            });
        }

        self.shared.settings().url = url.to_string();
        tracing::info!(url, "url updated");
        self.shared.trigger();
        Ok(())
    }

    /// Read the persisted URL into memory. Does not connect.
    pub async fn load_url(&self) -> Result<Option<String>, SupervisorError> {
        let _write = self.shared.writes.lock().await;

        let Some(bytes) = self
            .store
            .get(CONNECTION_BUCKET, URL_KEY)
            .await
            .map_err(SupervisorError::Load)?
        else {
            return Ok(None);
        };
        let url = String::from_utf8(bytes.to_vec())?;
        self.shared.settings().url = url.clone();
        tracing::info!(url = %url, "loaded persisted url");
        Ok(Some(url))
    }

    /// Connect, but only the first time this is ever called
    pub fn connect_once(&self) {
        let first = {
            let mut settings = self.shared.settings();
            !std::mem::replace(&mut settings.connect_requested, true)
        };
        if first {
            self.shared.trigger();
        }
    }
}

/// How an attempt ended
#[derive(Debug)]
enum Outcome {
    DialFailed(TransportError),
    ReadEnded(TransportError),
}

/// The in-flight dial and read loop
struct Attempt<C> {
    client: Arc<C>,
    task: JoinHandle<Outcome>,
}

/// Owns the connection lifecycle; run it with [`Supervisor::run`]
pub struct Supervisor<D, S> {
    dialer: D,
    buffer: Arc<LogBuffer>,
    decoder: RecordDecoder,
    config: SupervisorConfig,
    shared: Arc<Shared>,
    store: S,
    triggers: mpsc::Receiver<()>,
}

impl<D: Dialer, S: KvStore> Supervisor<D, S> {
    pub fn new(
        dialer: D,
        store: S,
        buffer: Arc<LogBuffer>,
        decoder: RecordDecoder,
        config: SupervisorConfig,
    ) -> Self {
        let (trigger, triggers) = mpsc::channel(1);
        let shared = Arc::new(Shared {
            status: StatusCell::new(ConnectionStatus::Disconnected),
            settings: Mutex::new(Settings::default()),
            writes: tokio::sync::Mutex::new(()),
            trigger,
        });
        Self {
            dialer,
            buffer,
            decoder,
            config,
            shared,
            store,
            triggers,
        }
    }

    pub fn handle(&self) -> SupervisorHandle<S> {
        SupervisorHandle {
            shared: Arc::clone(&self.shared),
            store: self.store.clone(),
        }
    }

    /// Drive connections until `shutdown` is cancelled.
    ///
    /// On return no attempt is running and the status is `Disconnected`.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut active: Option<Attempt<D::Client>> = None;
        let mut retry_at: Option<Instant> = None;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                Some(()) = self.triggers.recv() => {
                    retry_at = None;
                    self.shared.status.store(ConnectionStatus::Connecting);
                    stop(active.take()).await;
                    active = Some(self.start());
                }
                outcome = finished(&mut active) => {
                    active = None;
                    match outcome {
                        Outcome::DialFailed(e) => {
                            tracing::warn!(error = %e, "dial failed");
                            self.shared.status.store(ConnectionStatus::Error);
                        }
                        Outcome::ReadEnded(e) => {
                            tracing::info!(error = %e, "connection lost");
                            self.shared.status.store(ConnectionStatus::Disconnected);
                        }
                    }
                    tracing::debug!(
                        delay_ms = self.config.reconnect_delay.as_millis() as u64,
                        "reconnect scheduled"
                    );
                    retry_at = Some(Instant::now() + self.config.reconnect_delay);
                }
                _ = wait_until(retry_at) => {
                    retry_at = None;
                    active = Some(self.start());
                }
            }
        }

        tracing::info!("supervisor shutting down");
        stop(active.take()).await;
        self.shared.status.store(ConnectionStatus::Disconnected);
    }

    /// Spawn a dial and read loop on a fresh client
    fn start(&self) -> Attempt<D::Client> {
        self.shared.status.store(ConnectionStatus::Connecting);
        let url = self.shared.settings().url.clone();
        let client = Arc::new(self.dialer.client());

        let task = tokio::spawn(connect(
            Arc::clone(&client),
            url,
            Arc::clone(&self.shared),
            Arc::clone(&self.buffer),
            self.decoder,
        ));
        Attempt { client, task }
    }
}

async fn connect<C: TransportClient>(
    client: Arc<C>,
    url: String,
    shared: Arc<Shared>,
    buffer: Arc<LogBuffer>,
    decoder: RecordDecoder,
) -> Outcome {
    if url.is_empty() {
        return Outcome::DialFailed(TransportError::Dial("no url configured".into()));
    }
    if let Err(e) = client.dial(&url).await {
        return Outcome::DialFailed(e);
    }
    shared.status.store(ConnectionStatus::Connected);
    tracing::info!(url = %url, "connected");

    Outcome::ReadEnded(ingest(client.as_ref(), &decoder, &buffer).await)
}

/// Close the attempt's client and wait for its task to exit
async fn stop<C: TransportClient>(attempt: Option<Attempt<C>>) {
    let Some(attempt) = attempt else {
        return;
    };
    if let Err(e) = attempt.client.close().await {
        tracing::debug!(error = %e, "close during stop");
    }
    if let Err(e) = attempt.task.await {
        tracing::error!(error = %e, "connection task failed");
    }
}

/// Resolves when the active attempt ends; pending while there is none
async fn finished<C>(active: &mut Option<Attempt<C>>) -> Outcome {
    let Some(attempt) = active else {
        return std::future::pending().await;
    };
    match (&mut attempt.task).await {
        Ok(outcome) => outcome,
        Err(e) => Outcome::ReadEnded(TransportError::Read(format!("connection task failed: {e}"))),
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
