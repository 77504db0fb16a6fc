// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized bucket contents from log replay

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One write to a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Put {
    pub bucket: String,
    pub key: String,
    #[serde(with = "base64_value")]
    pub value: Vec<u8>,
}

/// Values are stored as standard base64 strings
mod base64_value {
    use base64::{engine::general_purpose::STANDARD as base64, Engine};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64.encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64.decode(encoded).map_err(de::Error::custom)
    }
}

/// Current value of every key, built by applying puts in order
#[derive(Debug, Default)]
pub struct MaterializedStore {
    buckets: HashMap<String, BTreeMap<String, Bytes>>,
}

impl MaterializedStore {
    /// Apply a put; later puts to the same key win
    pub fn apply(&mut self, put: &Put) {
        self.buckets
            .entry(put.bucket.clone())
            .or_default()
            .insert(put.key.clone(), Bytes::copy_from_slice(&put.value));
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets.get(bucket)?.get(key).cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of keys across all buckets
    pub fn len(&self) -> usize {
        self.buckets.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
