// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the connection engine

use logcrunch_storage::StoreError;
use thiserror::Error;

/// Errors surfaced to callers of the supervisor handle
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The URL could not be persisted. `url` is the value still in effect.
    #[error("failed to persist url (still using {url:?}): {source}")]
    Persist {
        url: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to load url: {0}")]
    Load(#[source] StoreError),
    #[error("persisted url is not valid utf-8")]
    InvalidUrl(#[from] std::string::FromUtf8Error),
}
