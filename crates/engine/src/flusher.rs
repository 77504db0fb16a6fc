// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persists buffered records through the unsaved cursor

use bytes::Bytes;
use logcrunch_core::{LogBuffer, Record};
use logcrunch_storage::{KvStore, StoreError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bucket holding encoded records, keyed by flush sequence.
///
/// Record ids repeat across producers and producer restarts, so they live
/// inside the stored value only. Keys are zero-padded so lexical order is
/// flush order.
pub const LOGS_BUCKET: &str = "logs";

/// Store key for the record written at `seq`
pub fn log_key(seq: u64) -> String {
    format!("{seq:020}")
}

/// Flusher timing and batch size
#[derive(Debug, Clone)]
pub struct FlusherConfig {
    pub interval: Duration,
    /// Records taken from the buffer per read
    pub batch: usize,
}

impl Default for FlusherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            batch: 256,
        }
    }
}

/// Drains the buffer's unsaved cursor into the store.
///
/// Records taken from the buffer stay in a pending queue until their put
/// succeeds, so a store outage delays persistence without losing records.
pub struct Flusher<S> {
    store: S,
    buffer: Arc<LogBuffer>,
    config: FlusherConfig,
    pending: VecDeque<Arc<Record>>,
    /// Sequence for the next stored record
    next_seq: u64,
}

impl<S: KvStore> Flusher<S> {
    /// Create a flusher that continues after the records already in `store`
    pub async fn open(
        store: S,
        buffer: Arc<LogBuffer>,
        config: FlusherConfig,
    ) -> Result<Self, StoreError> {
        let next_seq = store
            .keys(LOGS_BUCKET)
            .await?
            .iter()
            .filter_map(|key| key.parse::<u64>().ok())
            .max()
            .map_or(0, |last| last + 1);
        if next_seq > 0 {
            tracing::debug!(next_seq, "resuming record sequence");
        }

        Ok(Self {
            store,
            buffer,
            config,
            pending: VecDeque::new(),
            next_seq,
        })
    }

    /// Records taken from the buffer but not yet stored
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Write everything currently unsaved. Returns the number of records stored.
    ///
    /// Stops at the first store failure; the failed record and everything
    /// after it are retried on the next call.
    pub async fn flush(&mut self) -> Result<usize, StoreError> {
        let mut written = 0;
        loop {
            if self.pending.is_empty() {
                self.pending
                    .extend(self.buffer.read_unsaved(self.config.batch));
                if self.pending.is_empty() {
                    return Ok(written);
                }
            }

            while let Some(record) = self.pending.front().cloned() {
                match record.encode() {
                    Ok(bytes) => {
                        self.store
                            .put(LOGS_BUCKET, &log_key(self.next_seq), Bytes::from(bytes))
                            .await?;
                        self.next_seq += 1;
                        written += 1;
                    }
                    // Retrying cannot help
                    Err(e) => {
                        tracing::warn!(id = %record.id(), error = %e, "dropping unencodable record")
                    }
                }
                self.pending.pop_front();
            }
        }
    }

    /// Flush every `interval` until `shutdown`, then drain once more
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        self.tick().await;
        if !self.pending.is_empty() {
            tracing::error!(pending = self.pending.len(), "records left unsaved at shutdown");
        }
    }

    async fn tick(&mut self) {
        match self.flush().await {
            Ok(0) => {}
            Ok(written) => tracing::debug!(written, "flushed records"),
            Err(e) => tracing::warn!(pending = self.pending.len(), error = %e, "flush failed"),
        }
    }
}

#[cfg(test)]
#[path = "flusher_tests.rs"]
mod tests;
