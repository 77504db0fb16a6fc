// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridges transport frames into the log buffer

use logcrunch_adapters::{TransportClient, TransportError};
use logcrunch_core::{LogBuffer, RecordDecoder};

/// Decode every inbound frame and append it to `buffer` until the
/// connection ends. Malformed frames are logged and dropped.
///
/// Returns the error that ended the read.
pub async fn ingest<C>(client: &C, decoder: &RecordDecoder, buffer: &LogBuffer) -> TransportError
where
    C: TransportClient + ?Sized,
{
    let mut received = 0u64;
    let mut discarded = 0u64;

    let err = client
        .read(&mut |kind, payload: &[u8]| match decoder.decode(payload) {
            Ok(record) => {
                tracing::debug!(id = %record.id(), kind = ?record.kind(), "record received");
                buffer.append(record);
                received += 1;
            }
            Err(e) => {
                tracing::warn!(frame = ?kind, len = payload.len(), error = %e, "discarding malformed frame");
                discarded += 1;
            }
        })
        .await;

    tracing::info!(received, discarded, error = %err, "ingestion stopped");
    err
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
