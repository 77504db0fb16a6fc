// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Key/value persistence for logcrunch
//!
//! Values live in named buckets. The supervisor keeps the configured
//! endpoint here and the flusher writes encoded records.

mod error;
mod file;
mod memory;
mod state;

pub use error::{StoreError, StoreErrorKind, StoreOp};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use state::MaterializedStore;

use async_trait::async_trait;
use bytes::Bytes;

/// Bucketed key/value store
#[async_trait]
pub trait KvStore: Clone + Send + Sync + 'static {
    /// Fetch the value stored under `bucket`/`key`, if any
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Store `value` under `bucket`/`key`, replacing any previous value
    async fn put(&self, bucket: &str, key: &str, value: Bytes) -> Result<(), StoreError>;

    /// All keys currently stored in `bucket`, in sorted order
    async fn keys(&self, bucket: &str) -> Result<Vec<String>, StoreError>;
}
