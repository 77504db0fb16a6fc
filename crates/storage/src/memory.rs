// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store for tests and ephemeral runs

use crate::error::{StoreError, StoreErrorKind, StoreOp};
use crate::state::{MaterializedStore, Put};
use crate::KvStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Non-durable store; failures can be injected per operation
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MaterializedStore>>,
    fail_gets: Arc<AtomicBool>,
    fail_puts: Arc<AtomicBool>,
    puts: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent get and key listing fail
    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent put fail
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Number of successful puts
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Bytes>, StoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::new(
                StoreOp::Get,
                StoreErrorKind::Other("injected failure".into()),
            ));
        }
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.get(bucket, key))
    }

    async fn put(&self, bucket: &str, key: &str, value: Bytes) -> Result<(), StoreError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::new(
                StoreOp::Put,
                StoreErrorKind::Other("injected failure".into()),
            ));
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.apply(&Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            value: value.to_vec(),
        });
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::new(
                StoreOp::Get,
                StoreErrorKind::Other("injected failure".into()),
            ));
        }
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.keys(bucket))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
