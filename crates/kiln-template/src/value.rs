//! Loosely-typed configuration values.
//!
//! Template `ami` and `variables` maps hold whatever the definition file
//! says: strings, numbers, booleans, nested maps and lists. [`Value`] keeps
//! that shape explicit instead of passing a fully dynamic document around.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// A key-sorted map of configuration values.
pub type Settings = BTreeMap<String, Value>;

/// A configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Map(Settings),
}

impl Value {
    /// Interpret a command-line setting value.
    ///
    /// The text is first parsed as a structured (JSON) value; anything that
    /// does not parse is kept verbatim as a string.
    pub fn parse_setting(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(_) => Value::String(raw.to_string()),
        }
    }

    /// String contents, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Map contents, if this is a map.
    pub fn as_map(&self) -> Option<&Settings> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<Settings> for Value {
    fn from(map: Settings) -> Self {
        Value::Map(map)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => match serde_json::to_string(other) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

/// Split a `key=value` command-line setting.
///
/// Only the first `=` separates; the value may contain further `=`.
pub fn parse_setting_pair(s: &str) -> Result<(String, Value), TemplateError> {
    let (key, raw) = s.split_once('=').ok_or_else(|| TemplateError::InvalidSetting {
        setting: s.to_string(),
        reason: "expected KEY=VALUE".to_string(),
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(TemplateError::InvalidSetting {
            setting: s.to_string(),
            reason: "key must not be empty".to_string(),
        });
    }

    Ok((key.to_string(), Value::parse_setting(raw)))
}

/// Overlay `overlay` onto `base`, recursing into maps present on both sides.
///
/// Any other collision is resolved in favor of `overlay`. Values are cloned,
/// so the result never aliases either input.
pub fn merge_deep(base: &Settings, overlay: &Settings) -> Settings {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let combined = match (merged.get(key), value) {
            (Some(Value::Map(ours)), Value::Map(theirs)) => Value::Map(merge_deep(ours, theirs)),
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}
