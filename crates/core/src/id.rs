// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record identity
//!
//! Producers have been observed sending two incompatible identity shapes:
//! a bare opaque string and a structured `{producer_id, sequence_number}`
//! object. Some payload variants also send a bare integer, which is kept
//! as an opaque identity. Which shapes a decoder accepts is configured
//! with [`IdShape`].

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Producer-scoped identity of a record.
///
/// Orders records from one producer but is not unique across producers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RecordId {
    Opaque(String),
    Structured {
        producer_id: String,
        sequence_number: i64,
    },
}

impl RecordId {
    pub fn opaque(id: impl Into<String>) -> Self {
        RecordId::Opaque(id.into())
    }

    pub fn structured(producer_id: impl Into<String>, sequence_number: i64) -> Self {
        RecordId::Structured {
            producer_id: producer_id.into(),
            sequence_number,
        }
    }

    /// Whether this is the identity a payload without one decodes to.
    ///
    /// The zero identity says nothing about the producer's shape, so every
    /// [`IdShape`] accepts it.
    pub fn is_zero(&self) -> bool {
        match self {
            RecordId::Opaque(id) => id.is_empty(),
            RecordId::Structured {
                producer_id,
                sequence_number,
            } => producer_id.is_empty() && *sequence_number == 0,
        }
    }

    /// Which shape this identity was decoded from
    pub fn shape(&self) -> IdShape {
        match self {
            RecordId::Opaque(_) => IdShape::Opaque,
            RecordId::Structured { .. } => IdShape::Structured,
        }
    }

    /// Interpret a JSON value as an identity of any supported shape
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RecordId::Opaque(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(RecordId::Opaque(n.to_string())),
            Value::Object(map) => {
                let producer_id = match map.get("producer_id") {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(_) => return None,
                };
                let sequence_number = match map.get("sequence_number") {
                    None | Some(Value::Null) => 0,
                    Some(v) => v.as_i64()?,
                };
                Some(RecordId::Structured {
                    producer_id,
                    sequence_number,
                })
            }
            _ => None,
        }
    }
}

/// Empty producer at sequence zero
impl Default for RecordId {
    fn default() -> Self {
        RecordId::structured("", 0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        RecordId::from_value(&value)
            .ok_or_else(|| de::Error::custom(format!("unsupported record id: {value}")))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Opaque(id) => write!(f, "{id}"),
            RecordId::Structured {
                producer_id,
                sequence_number,
            } => write!(f, "{producer_id}:{sequence_number}"),
        }
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Opaque(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::Opaque(id)
    }
}

/// Identity shape a decoder accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdShape {
    /// Accept whichever shape the payload carries
    #[default]
    Sniff,
    Opaque,
    Structured,
}

impl IdShape {
    /// Whether an identity of `found` shape satisfies this configuration
    pub fn accepts(self, found: IdShape) -> bool {
        self == IdShape::Sniff || self == found
    }
}

impl fmt::Display for IdShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdShape::Sniff => write!(f, "sniff"),
            IdShape::Opaque => write!(f, "opaque"),
            IdShape::Structured => write!(f, "structured"),
        }
    }
}

impl std::str::FromStr for IdShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sniff" => Ok(IdShape::Sniff),
            "opaque" => Ok(IdShape::Opaque),
            "structured" => Ok(IdShape::Structured),
            other => Err(format!("unknown id shape: {other}")),
        }
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
