// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decoded log records
//!
//! A [`Record`] is built exactly once from a self-describing JSON payload
//! and never changes afterwards. The flattened [`AttrIndex`] is computed at
//! decode time and is never serialized.

use crate::id::{IdShape, RecordId};
use crate::index::{flatten_into, AttrIndex, Scalar};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Errors produced while decoding a record payload
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("record id shape mismatch: expected {expected}, found {found}")]
    IdShape { expected: IdShape, found: IdShape },
}

/// Record classification derived from the span timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Info,
    Metric,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Info => write!(f, "info"),
            RecordKind::Metric => write!(f, "metric"),
        }
    }
}

/// Where a record was emitted.
///
/// Producers fill either file/line/function or namespace/class/function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub source_file: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "is_zero_i64"
    )]
    pub source_line: i64,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub source_function: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub source_namespace: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub source_class: String,
}

/// One decoded log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireRecord")]
pub struct Record {
    id: RecordId,
    timestamp: f64,
    level: String,
    message: String,
    #[serde(flatten)]
    origin: Origin,
    #[serde(rename = "function_call_started_at", skip_serializing_if = "is_zero_f64")]
    call_started_at: f64,
    #[serde(rename = "function_call_ended_at", skip_serializing_if = "is_zero_f64")]
    call_ended_at: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    call_stack: Vec<RecordId>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    attrs: Map<String, Value>,
    #[serde(skip)]
    index: AttrIndex,
}

/// Payload shape as it arrives on the wire
#[derive(Deserialize)]
struct WireRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    id: RecordId,
    #[serde(default, deserialize_with = "null_as_default")]
    timestamp: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    level: String,
    #[serde(default, deserialize_with = "null_as_default")]
    message: String,
    #[serde(flatten)]
    origin: Origin,
    #[serde(default, deserialize_with = "null_as_default")]
    function_call_started_at: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    function_call_ended_at: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    call_stack: Vec<RecordId>,
    #[serde(default, deserialize_with = "null_as_default")]
    attrs: Map<String, Value>,
}

impl From<WireRecord> for Record {
    fn from(wire: WireRecord) -> Self {
        Record {
            id: wire.id,
            timestamp: wire.timestamp,
            level: wire.level,
            message: wire.message,
            origin: wire.origin,
            call_started_at: wire.function_call_started_at,
            call_ended_at: wire.function_call_ended_at,
            call_stack: wire.call_stack,
            attrs: wire.attrs,
            index: AttrIndex::new(),
        }
        .reindexed()
    }
}

impl Record {
    /// Create a record with only the required fields set
    pub fn new(id: impl Into<RecordId>, level: impl Into<String>, message: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            timestamp: 0.0,
            level: level.into(),
            message: message.into(),
            origin: Origin::default(),
            call_started_at: 0.0,
            call_ended_at: 0.0,
            call_stack: Vec::new(),
            attrs: Map::new(),
            index: AttrIndex::new(),
        }
        .reindexed()
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self.reindexed()
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self.reindexed()
    }

    pub fn with_span(mut self, started_at: f64, ended_at: f64) -> Self {
        self.call_started_at = started_at;
        self.call_ended_at = ended_at;
        self.reindexed()
    }

    pub fn with_call_stack(mut self, call_stack: Vec<RecordId>) -> Self {
        self.call_stack = call_stack;
        self.reindexed()
    }

    pub fn with_attrs(mut self, attrs: Map<String, Value>) -> Self {
        self.attrs = attrs;
        self.reindexed()
    }

    /// Decode a payload accepting either identity shape
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        RecordDecoder::default().decode(bytes)
    }

    /// Serialize the record back to its wire form. The index is not included.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn call_started_at(&self) -> f64 {
        self.call_started_at
    }

    pub fn call_ended_at(&self) -> f64 {
        self.call_ended_at
    }

    pub fn call_stack(&self) -> &[RecordId] {
        &self.call_stack
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    /// Flattened index computed at decode time
    pub fn index(&self) -> &AttrIndex {
        &self.index
    }

    /// Look up one dotted path in the index
    pub fn get(&self, path: &str) -> Option<&Scalar> {
        self.index.get(path)
    }

    /// METRIC when both span timestamps are set, INFO otherwise
    pub fn kind(&self) -> RecordKind {
        if self.call_started_at != 0.0 && self.call_ended_at != 0.0 {
            RecordKind::Metric
        } else {
            RecordKind::Info
        }
    }

    /// Build the flattened index from the fixed fields and attributes.
    ///
    /// Fixed fields are always present, at their zero value when absent
    /// from the payload.
    pub fn flatten_attributes(&self) -> AttrIndex {
        let mut index = AttrIndex::new();

        let (producer_id, sequence_number) = match &self.id {
            RecordId::Structured {
                producer_id,
                sequence_number,
            } => (producer_id.as_str(), *sequence_number),
            RecordId::Opaque(_) => ("", 0),
        };
        index.insert("id".into(), Scalar::String(self.id.to_string()));
        index.insert("id.producer_id".into(), producer_id.into());
        index.insert("id.sequence_number".into(), sequence_number.into());

        index.insert("timestamp".into(), self.timestamp.into());
        index.insert("level".into(), self.level.as_str().into());
        index.insert("message".into(), self.message.as_str().into());
        index.insert("source_file".into(), self.origin.source_file.as_str().into());
        index.insert("source_line".into(), self.origin.source_line.into());
        index.insert(
            "source_function".into(),
            self.origin.source_function.as_str().into(),
        );
        index.insert(
            "source_namespace".into(),
            self.origin.source_namespace.as_str().into(),
        );
        index.insert("source_class".into(), self.origin.source_class.as_str().into());
        index.insert("function_call_started_at".into(), self.call_started_at.into());
        index.insert("function_call_ended_at".into(), self.call_ended_at.into());
        index.insert("call_stack".into(), Scalar::Null);

        flatten_into(&self.attrs, "attrs", &mut index);
        index
    }

    fn reindexed(mut self) -> Self {
        self.index = self.flatten_attributes();
        self
    }
}

/// Decodes record payloads, enforcing a configured identity shape
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordDecoder {
    shape: IdShape,
}

impl RecordDecoder {
    pub fn new(shape: IdShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> IdShape {
        self.shape
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Record, DecodeError> {
        let record: Record = serde_json::from_slice(bytes)?;
        let found = record.id.shape();
        if !record.id.is_zero() && !self.shape.accepts(found) {
            return Err(DecodeError::IdShape {
                expected: self.shape,
                found,
            });
        }
        Ok(record)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_zero_f64(value: &f64) -> bool {
    *value == 0.0
}

fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
