//! Structured setting values and the reversible export encoding.
//!
//! Scalars travel through the document as plain JSON scalars. Lists and maps
//! are folded into a single string: the [`MARKER`] prefix followed by the
//! compact, tagged JSON of the value. A plain string that happens to start
//! with the marker is folded the same way so that decoding can never mistake
//! it for a structure.
//!
//! ```text
//! "Acme"                       -> "Acme"
//! ["a", 1]                     -> "optport:v1:{\"list\":[{\"str\":\"a\"},{\"int\":1}]}"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Prefix for folded (non-scalar) values. The suffix is the codec version.
pub const MARKER: &str = "optport:v1:";

/// A setting value as held by a settings store.
///
/// The representation is independent of any host language's native object
/// serialization. Map keys keep their insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<SettingValue>),
    Map(IndexMap<String, SettingValue>),
}

impl SettingValue {
    /// Whether this value is carried as a bare JSON scalar when encoded.
    pub fn is_scalar(&self) -> bool {
        match self {
            SettingValue::List(_) | SettingValue::Map(_) => false,
            SettingValue::Str(s) => !s.starts_with(MARKER),
            _ => true,
        }
    }

    /// Build a value from ordinary JSON (arrays become lists, objects maps).
    ///
    /// Used for hand-edited documents and for values typed on the command line.
    pub fn from_plain_json(value: Value) -> Self {
        match value {
            Value::Null => SettingValue::Null,
            Value::Bool(b) => SettingValue::Bool(b),
            Value::Number(n) => number_to_value(&n),
            Value::String(s) => SettingValue::Str(s),
            Value::Array(items) => {
                SettingValue::List(items.into_iter().map(Self::from_plain_json).collect())
            }
            Value::Object(map) => SettingValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_plain_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render as ordinary JSON, dropping the variant tags.
    pub fn to_plain_json(&self) -> Value {
        match self {
            SettingValue::Null => Value::Null,
            SettingValue::Bool(b) => Value::Bool(*b),
            SettingValue::Int(i) => Value::from(*i),
            SettingValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SettingValue::Str(s) => Value::String(s.clone()),
            SettingValue::List(items) => {
                Value::Array(items.iter().map(Self::to_plain_json).collect())
            }
            SettingValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_plain_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Str(s) => write!(f, "{s}"),
            SettingValue::List(_) | SettingValue::Map(_) => {
                let pretty = serde_json::to_string_pretty(&self.to_plain_json())
                    .map_err(|_| fmt::Error)?;
                write!(f, "{pretty}")
            }
            other => write!(f, "{}", other.to_plain_json()),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::Str(s.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(s: String) -> Self {
        SettingValue::Str(s)
    }
}

impl From<i64> for SettingValue {
    fn from(i: i64) -> Self {
        SettingValue::Int(i)
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Bool(b)
    }
}

fn number_to_value(n: &serde_json::Number) -> SettingValue {
    match n.as_i64() {
        Some(i) => SettingValue::Int(i),
        None => SettingValue::Float(n.as_f64().unwrap_or_default()),
    }
}

/// Encode a value for the export document.
///
/// Non-finite floats have no JSON form and are written as `null`.
pub fn encode(value: &SettingValue) -> Value {
    if !value.is_scalar() {
        return fold(value);
    }
    match value {
        SettingValue::Str(s) => Value::String(s.clone()),
        other => other.to_plain_json(),
    }
}

fn fold(value: &SettingValue) -> Value {
    match serde_json::to_string(value) {
        Ok(payload) => Value::String(format!("{MARKER}{payload}")),
        // Only reachable through map keys that are not strings, which the
        // type rules out; keep the plain rendering rather than panic.
        Err(_) => value.to_plain_json(),
    }
}

/// Decode a value read from an export document.
///
/// A marker string whose payload does not parse is kept verbatim as a string.
pub fn decode(encoded: &Value) -> SettingValue {
    match encoded {
        Value::String(s) => match s.strip_prefix(MARKER) {
            Some(payload) => serde_json::from_str(payload)
                .unwrap_or_else(|_| SettingValue::Str(s.clone())),
            None => SettingValue::Str(s.clone()),
        },
        other => SettingValue::from_plain_json(other.clone()),
    }
}
