// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store errors tagged with the failing operation

use std::fmt;
use std::io;
use thiserror::Error;

/// Store operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Open,
    Close,
    Get,
    Put,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::Open => write!(f, "open"),
            StoreOp::Close => write!(f, "close"),
            StoreOp::Get => write!(f, "get"),
            StoreOp::Put => write!(f, "put"),
        }
    }
}

/// Underlying cause of a store failure
#[derive(Debug, Error)]
pub enum StoreErrorKind {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store is closed")]
    Closed,
    #[error("{0}")]
    Other(String),
}

/// A failed store operation
#[derive(Debug, Error)]
#[error("store {op}: {kind}")]
pub struct StoreError {
    pub op: StoreOp,
    #[source]
    pub kind: StoreErrorKind,
}

impl StoreError {
    pub fn new(op: StoreOp, kind: impl Into<StoreErrorKind>) -> Self {
        Self {
            op,
            kind: kind.into(),
        }
    }
}
