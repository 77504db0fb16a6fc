// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory log buffer with independent consumer cursors
//!
//! Records are appended in arrival order and never removed. Two consumers
//! (the live-tail viewer and the persistence writer) each own a cursor
//! that only moves forward, so a record handed to one consumer stays
//! pending for the other until its own cursor passes it.

use crate::record::Record;
use std::sync::{Arc, RwLock};

/// Append-only record sequence shared by the ingestion loop and readers
#[derive(Debug, Default)]
pub struct LogBuffer {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<Arc<Record>>,
    /// Number of records delivered to the live-tail consumer
    unread: usize,
    /// Number of records delivered to the persistence consumer
    unsaved: usize,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                records: Vec::with_capacity(capacity),
                ..Inner::default()
            }),
        }
    }

    /// Append one record. Cursors are not touched.
    pub fn append(&self, record: Record) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.records.push(Arc::new(record));
    }

    /// Append several records under one lock hold, so readers never see a
    /// partial batch.
    pub fn append_batch(&self, records: impl IntoIterator<Item = Record>) {
        let records: Vec<_> = records.into_iter().map(Arc::new).collect();
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.records.extend(records);
    }

    /// Snapshot of `limit` records ending `offset` records before the tail,
    /// i.e. indices `[len - offset - limit, len - offset)`.
    ///
    /// Empty when `limit` is zero or `offset + limit >= len`. No cursor moves.
    pub fn read_window(&self, offset: usize, limit: usize) -> Vec<Arc<Record>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let len = inner.records.len();
        let Some(span) = offset.checked_add(limit) else {
            return Vec::new();
        };
        if limit == 0 || span >= len {
            return Vec::new();
        }

        let start = len - span;
        inner.records[start..start + limit].to_vec()
    }

    /// Up to `limit` records after the live-tail cursor; advances it by the
    /// number returned.
    pub fn read_unread(&self, limit: usize) -> Vec<Arc<Record>> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let Inner {
            records, unread, ..
        } = &mut *inner;
        take_after(records, unread, limit)
    }

    /// Up to `limit` records after the persistence cursor; advances it by
    /// the number returned.
    pub fn read_unsaved(&self, limit: usize) -> Vec<Arc<Record>> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let Inner {
            records, unsaved, ..
        } = &mut *inner;
        take_after(records, unsaved, limit)
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the last record delivered to the live-tail consumer
    pub fn unread_cursor(&self) -> Option<usize> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.unread.checked_sub(1)
    }

    /// Index of the last record delivered to the persistence consumer
    pub fn unsaved_cursor(&self) -> Option<usize> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.unsaved.checked_sub(1)
    }
}

fn take_after(records: &[Arc<Record>], delivered: &mut usize, limit: usize) -> Vec<Arc<Record>> {
    let start = *delivered;
    if limit == 0 || start >= records.len() {
        return Vec::new();
    }

    let end = start.saturating_add(limit).min(records.len());
    *delivered = end;
    records[start..end].to_vec()
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
