// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flattened attribute index
//!
//! Maps dotted paths (`attrs.user.name`) to scalar leaves so search and
//! filtering can look up any field without walking nested attributes.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Dotted path to scalar leaf value
pub type AttrIndex = BTreeMap<String, Scalar>;

/// A leaf value in the attribute index.
///
/// Arrays are present in the index but opaque: they map to `Null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n as f64)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::String(s) => write!(f, "{s}"),
        }
    }
}

/// Flatten a nested attribute mapping into `dest` under `prefix`.
///
/// Nested objects recurse with a `.` separator; arrays and nulls become
/// [`Scalar::Null`].
pub fn flatten_into(attrs: &Map<String, Value>, prefix: &str, dest: &mut AttrIndex) {
    for (key, value) in attrs {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            Value::Object(nested) => flatten_into(nested, &path, dest),
            Value::String(s) => {
                dest.insert(path, Scalar::String(s.clone()));
            }
            Value::Number(n) => {
                dest.insert(path, n.as_f64().map_or(Scalar::Null, Scalar::Number));
            }
            Value::Bool(b) => {
                dest.insert(path, Scalar::Bool(*b));
            }
            Value::Array(_) | Value::Null => {
                dest.insert(path, Scalar::Null);
            }
        }
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
