//! Raw push payloads and defensive field reads
//!
//! The push transport hands over an untyped key-value mapping. Nothing about
//! its shape is guaranteed: any key may be missing, null, or carry a value of
//! an unexpected type. This module wraps that mapping and provides the typed
//! read helpers the classifier uses, each of which reports whether the field
//! was usable, missing, or mistyped instead of failing.
//!
//! # Examples
//!
//! ```rust
//! use rvoip_push_core::payload::RawPushPayload;
//! use serde_json::json;
//!
//! let payload = RawPushPayload::from_value(json!({
//!     "type": "cancel_call",
//!     "nameCaller": "Alice",
//! }));
//!
//! assert_eq!(payload.discriminator(), Some("cancel_call"));
//! assert_eq!(payload.len(), 2);
//!
//! // Anything that isn't a JSON object is treated as an empty payload
//! let odd = RawPushPayload::from_value(json!([1, 2, 3]));
//! assert!(odd.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Key of the discriminator field inspected before anything else
pub const DISCRIMINATOR_KEY: &str = "type";

/// Untyped mapping delivered by the push transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPushPayload(Map<String, Value>);

impl RawPushPayload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap an existing JSON object
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Build a payload from any JSON value
    ///
    /// Objects are taken as-is. Every other value (arrays, scalars, null)
    /// yields an empty payload, which classifies as a fully defaulted
    /// incoming call.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }

    /// Parse a payload from JSON text
    ///
    /// Only syntactically invalid JSON is an error; well-formed JSON of any
    /// shape is accepted through [`RawPushPayload::from_value`].
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    /// Builder-style insert, mostly useful for constructing payloads in code
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Raw access to a field, with `null` reported as absent
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.0.get(key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    /// The discriminator value, if it is present and a string
    pub fn discriminator(&self) -> Option<&str> {
        self.get(DISCRIMINATOR_KEY).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for RawPushPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self::from_map(map)
    }
}

impl From<Value> for RawPushPayload {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

/// Outcome of a defensive read of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRead<T> {
    /// The field was present and usable
    Present(T),
    /// The field was absent or null
    Missing,
    /// The field was present but could not be coerced to the expected type
    Mistyped,
}

impl<T> FieldRead<T> {
    /// The value, if one was read
    pub fn ok(self) -> Option<T> {
        match self {
            FieldRead::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Apply `f` to a present value, keeping the read outcome otherwise
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Option<U>) -> FieldRead<U> {
        match self {
            FieldRead::Present(value) => match f(value) {
                Some(mapped) => FieldRead::Present(mapped),
                None => FieldRead::Mistyped,
            },
            FieldRead::Missing => FieldRead::Missing,
            FieldRead::Mistyped => FieldRead::Mistyped,
        }
    }
}

/// Read a string, rendering numbers and booleans with their JSON text
pub fn read_string(value: Option<&Value>) -> FieldRead<String> {
    match value {
        None | Some(Value::Null) => FieldRead::Missing,
        Some(Value::String(s)) => FieldRead::Present(s.clone()),
        Some(Value::Number(n)) => FieldRead::Present(n.to_string()),
        Some(Value::Bool(b)) => FieldRead::Present(b.to_string()),
        Some(_) => FieldRead::Mistyped,
    }
}

/// Read an integer from a number (integral floats included) or a numeric string
pub fn read_integer(value: Option<&Value>) -> FieldRead<i64> {
    match value {
        None | Some(Value::Null) => FieldRead::Missing,
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return FieldRead::Present(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    FieldRead::Present(f as i64)
                }
                _ => FieldRead::Mistyped,
            }
        }
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(i) => FieldRead::Present(i),
            Err(_) => FieldRead::Mistyped,
        },
        Some(_) => FieldRead::Mistyped,
    }
}

/// Read a non-negative integer that fits in a `u32`
pub fn read_u32(value: Option<&Value>) -> FieldRead<u32> {
    read_integer(value).and_then(|i| u32::try_from(i).ok())
}

/// Read a boolean; only JSON booleans qualify
pub fn read_bool(value: Option<&Value>) -> FieldRead<bool> {
    match value {
        None | Some(Value::Null) => FieldRead::Missing,
        Some(Value::Bool(b)) => FieldRead::Present(*b),
        Some(_) => FieldRead::Mistyped,
    }
}

/// Read a nested mapping
pub fn read_object(value: Option<&Value>) -> FieldRead<Map<String, Value>> {
    match value {
        None | Some(Value::Null) => FieldRead::Missing,
        Some(Value::Object(map)) => FieldRead::Present(map.clone()),
        Some(_) => FieldRead::Mistyped,
    }
}
