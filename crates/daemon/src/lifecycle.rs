// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Arc;

use fs2::FileExt;
use logcrunch_adapters::{TracedDialer, WsDialer};
use logcrunch_core::{LogBuffer, RecordDecoder};
use logcrunch_engine::{Flusher, Supervisor, SupervisorError, SupervisorHandle};
use logcrunch_storage::{FileStore, StoreError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::tail;

/// Production dialer: websocket client wrapped with tracing
pub type DaemonDialer = TracedDialer<WsDialer>;

/// Running daemon
pub struct Daemon {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    store: FileStore,
    pub buffer: Arc<LogBuffer>,
    pub handle: SupervisorHandle<FileStore>,
    /// Stops the supervisor
    connection_shutdown: CancellationToken,
    /// Stops the buffer consumers, after the supervisor has stopped
    consumer_shutdown: CancellationToken,
    supervisor: JoinHandle<()>,
    consumers: Vec<JoinHandle<()>>,
}

impl Daemon {
    /// Stop the connection, drain the buffer and release the lock
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Stop ingesting; no record is appended after this returns
        self.connection_shutdown.cancel();
        if let Err(e) = self.supervisor.await {
            error!(error = %e, "supervisor task failed");
        }

        // 2. Let the flusher and tail take their final drain
        self.consumer_shutdown.cancel();
        for task in self.consumers {
            if let Err(e) = task.await {
                error!(error = %e, "consumer task failed");
            }
        }

        // 3. Close the store
        self.store.close()?;

        // 4. Remove PID file; the lock itself is released when lock_file drops
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    match startup_inner(config).await {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            // The PID file belongs to the running daemon when the lock is taken
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<Daemon, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents two daemons sharing one store
    let mut lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Open the store
    let store = FileStore::open(&config.store_path)?;
    info!(
        path = %config.store_path.display(),
        sequence = store.sequence(),
        "store opened"
    );

    // 4. Wire the supervisor (wrapped with tracing for observability)
    let buffer = Arc::new(LogBuffer::new());
    let dialer: DaemonDialer = TracedDialer::new(WsDialer::new(config.transport.clone()));
    let supervisor = Supervisor::new(
        dialer,
        store.clone(),
        Arc::clone(&buffer),
        RecordDecoder::new(config.id_shape),
        config.supervisor.clone(),
    );
    let handle = supervisor.handle();
    let flusher =
        Flusher::open(store.clone(), Arc::clone(&buffer), config.flusher.clone()).await?;

    // 5. Pick the endpoint. Triggers queue until the supervisor runs.
    let saved = handle.load_url().await?;
    match (&config.source, saved) {
        (Some(source), _) => handle.set_url(source).await?,
        (None, Some(url)) => {
            info!(url = %url, "resuming saved source");
            handle.connect_once();
        }
        (None, None) => warn!("no source configured, pass --source to connect"),
    }

    // 6. Spawn tasks (LAST - only after all validation passes)
    let connection_shutdown = CancellationToken::new();
    let consumer_shutdown = CancellationToken::new();

    let supervisor = tokio::spawn(supervisor.run(connection_shutdown.clone()));

    let mut consumers = Vec::new();
    consumers.push(tokio::spawn(flusher.run(consumer_shutdown.clone())));
    if config.tail {
        consumers.push(tokio::spawn(tail::run(
            Arc::clone(&buffer),
            std::io::stdout(),
            consumer_shutdown.clone(),
        )));
    }

    info!(
        state_dir = %config.state_dir.display(),
        id_shape = %config.id_shape,
        "Daemon started"
    );

    Ok(Daemon {
        config: config.clone(),
        lock_file,
        store,
        buffer,
        handle,
        connection_shutdown,
        consumer_shutdown,
        supervisor,
        consumers,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
