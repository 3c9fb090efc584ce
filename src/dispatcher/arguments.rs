//! Argument access for capability handlers.
//!
//! Presence uses a falsy test: absent, `null`, `false`, numeric zero and the
//! empty string all count as missing. Valid Metabase ids are always positive,
//! so a zero id is treated the same as no id. Arrays and objects are present
//! even when empty.
//!
//! Ids end up in resource paths, so [`Arguments::require_id`] only accepts
//! positive integers and strings made of ASCII digits.

use serde_json::{Map, Value};

use crate::errors::ValidationError;

/// Returns `false` for values that count as "not provided".
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn is_id(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_u64().is_some_and(|id| id > 0),
        Value::String(s) => !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()),
        _ => false,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Anything other than a JSON object yields no arguments.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn present(&self, key: &str) -> bool {
        is_present(self.0.get(key))
    }

    /// The value under `key`, if it passes the presence test.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| is_present(Some(*v)))
    }

    /// Present value under `key`, cloned.
    pub fn cloned(&self, key: &str) -> Option<Value> {
        self.value(key).cloned()
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    pub fn u64(&self, key: &str) -> Option<u64> {
        self.value(key).and_then(Value::as_u64)
    }

    pub fn require(&self, key: &str, message: &str) -> Result<&Value, ValidationError> {
        self.value(key).ok_or_else(|| {
            tracing::warn!(argument = key, "missing required argument");
            ValidationError::invalid_params(message)
        })
    }

    /// Like [`Arguments::require`], but rejects anything that is not a
    /// positive integer or a string of ASCII digits.
    pub fn require_id(&self, key: &str, message: &str) -> Result<Value, ValidationError> {
        let value = self.require(key, message)?;
        if is_id(value) {
            return Ok(value.clone());
        }
        tracing::warn!(argument = key, value = %value, "malformed id argument");
        Err(ValidationError::invalid_params(format!(
            "{key} must be a positive integer"
        )))
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
