// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! logcrunch connection engine
//!
//! The [`Supervisor`] owns the connection to the producer and restarts it
//! as needed, the [`ingest`] loop feeds decoded records into the shared
//! buffer, and the [`Flusher`] persists them.

mod error;
mod flusher;
mod ingest;
mod supervisor;

pub use error::SupervisorError;
pub use flusher::{log_key, Flusher, FlusherConfig, LOGS_BUCKET};
pub use ingest::ingest;
pub use supervisor::{
    Snapshot, Supervisor, SupervisorConfig, SupervisorHandle, CONNECTION_BUCKET, URL_KEY,
};
