// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live tail: prints records as they arrive

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use logcrunch_core::{LogBuffer, Record};
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub const TAIL_INTERVAL: Duration = Duration::from_millis(500);
const TAIL_BATCH: usize = 256;

/// `<timestamp> <LEVEL> [<kind>] <message>`
pub fn format_line(record: &Record) -> String {
    format!(
        "{} {} [{}] {}",
        record.timestamp(),
        record.level().to_uppercase(),
        record.kind(),
        record.message()
    )
}

/// Write every unread record to `out`. Returns the number written.
pub fn drain(buffer: &LogBuffer, out: &mut impl Write) -> std::io::Result<usize> {
    let mut written = 0;
    loop {
        let records = buffer.read_unread(TAIL_BATCH);
        if records.is_empty() {
            out.flush()?;
            return Ok(written);
        }
        for record in &records {
            writeln!(out, "{}", format_line(record))?;
        }
        written += records.len();
    }
}

/// Drain the unread cursor every [`TAIL_INTERVAL`] until `shutdown`
pub async fn run<W: Write + Send>(buffer: Arc<LogBuffer>, mut out: W, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(TAIL_INTERVAL);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = drain(&buffer, &mut out) {
                    warn!(error = %e, "tail output failed, stopping tail");
                    return;
                }
            }
        }
    }
    let _ = drain(&buffer, &mut out);
}

#[cfg(test)]
#[path = "tail_tests.rs"]
mod tests;
