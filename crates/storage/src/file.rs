// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable file-backed store
//!
//! Every put is appended as one JSON line and synced before returning.
//! Opening the store replays the file into memory; reads never touch disk.

use crate::error::{StoreError, StoreErrorKind, StoreOp};
use crate::state::{MaterializedStore, Put};
use crate::KvStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Append-only JSON-lines store
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    /// Held across the write and sync so entries land in sequence order
    log: Mutex<Log>,
    /// Reads only take this lock and never wait on a sync
    state: Mutex<MaterializedStore>,
}

struct Log {
    file: Option<File>,
    sequence: u64,
}

impl FileStore {
    /// Open or create a store at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let open = |e: io::Error| StoreError::new(StoreOp::Open, e);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(open)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)
            .map_err(open)?;

        let mut state = MaterializedStore::default();
        let mut sequence = 0;
        for entry in Self::replay(path).map_err(|kind| StoreError::new(StoreOp::Open, kind))? {
            sequence = sequence.max(entry.seq);
            state.apply(&entry.put);
        }

        tracing::debug!(path = %path.display(), sequence, keys = state.len(), "store opened");

        Ok(Self {
            inner: Arc::new(Inner {
                path: path.to_path_buf(),
                log: Mutex::new(Log {
                    file: Some(file),
                    sequence,
                }),
                state: Mutex::new(state),
            }),
        })
    }

    /// Sync and release the file. Further puts fail; gets keep working.
    pub fn close(&self) -> Result<(), StoreError> {
        let mut log = self.inner.log.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(file) = log.file.take() {
            file.sync_all()
                .map_err(|e| StoreError::new(StoreOp::Close, e))?;
        }
        Ok(())
    }

    /// Sequence number of the last applied put
    pub fn sequence(&self) -> u64 {
        self.inner
            .log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sequence
    }

    pub fn path(&self) -> PathBuf {
        self.inner.path.clone()
    }

    /// Read all entries from the file.
    ///
    /// A torn final line from an interrupted write is skipped.
    fn replay(path: &Path) -> Result<Vec<FileEntry>, StoreErrorKind> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<FileEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(line = lineno + 1, error = %e, "skipping corrupt store entry")
                }
            }
        }

        Ok(entries)
    }
}

impl Inner {
    /// Append, sync, then apply. Blocks on disk I/O.
    fn append(&self, put: Put) -> Result<(), StoreError> {
        let put_err = |kind: StoreErrorKind| StoreError::new(StoreOp::Put, kind);

        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        let entry = FileEntry {
            seq: log.sequence + 1,
            put,
        };
        let line = serde_json::to_string(&entry).map_err(|e| put_err(e.into()))?;

        let file = log
            .file
            .as_mut()
            .ok_or_else(|| put_err(StoreErrorKind::Closed))?;
        writeln!(file, "{}", line).map_err(|e| put_err(e.into()))?;
        file.sync_all().map_err(|e| put_err(e.into()))?;

        log.sequence = entry.seq;
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apply(&entry.put);
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Bytes>, StoreError> {
        let state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.get(bucket, key))
    }

    async fn put(&self, bucket: &str, key: &str, value: Bytes) -> Result<(), StoreError> {
        let put = Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            value: value.to_vec(),
        };
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.append(put))
            .await
            .map_err(|e| {
                StoreError::new(
                    StoreOp::Put,
                    StoreErrorKind::Other(format!("write task failed: {e}")),
                )
            })?
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        let state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.keys(bucket))
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct FileEntry {
    seq: u64,
    #[serde(flatten)]
    put: Put,
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
