// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! logcrunch-core: data model for the logcrunch ingestion daemon
//!
//! This crate provides:
//! - The decoded log [`Record`] and its flattened attribute index
//! - Record identity shapes and the configurable [`RecordDecoder`]
//! - The multi-cursor in-memory [`LogBuffer`]
//! - The [`ConnectionStatus`] reported by the connection supervisor

pub mod buffer;
pub mod id;
pub mod index;
pub mod record;
pub mod status;

pub use buffer::LogBuffer;
pub use id::{IdShape, RecordId};
pub use index::{AttrIndex, Scalar};
pub use record::{DecodeError, Origin, Record, RecordDecoder, RecordKind};
pub use status::{ConnectionStatus, StatusCell};
