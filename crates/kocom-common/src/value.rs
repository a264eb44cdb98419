//! Dynamic value type for device state and attributes.
//!
//! This module provides:
//! - [`Value`] - the dynamic value type carried by [`crate::DeviceState`]
//! - [`Attributes`] - the string-keyed attribute map

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute map attached to a device state.
pub type Attributes = BTreeMap<String, Value>;

// ============================================================================
// Value Enum
// ============================================================================

/// A state value or attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Integer value (i64).
    Integer(i64),
    /// Floating point value (f64).
    Float(f64),
    /// String value.
    String(String),
    /// List value.
    List(Vec<Value>),
    /// Nested map value.
    Map(BTreeMap<String, Value>),
    /// Null value.
    Null,
}

impl Value {
    /// Convert to i64 if possible.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Convert to u8 if possible.
    pub fn as_u8(&self) -> Option<u8> {
        self.as_i64().and_then(|v| u8::try_from(v).ok())
    }

    /// Convert to f64 if possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Borrow as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Convert to bool if possible.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow as a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Look up a field of a map value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(field))
    }

    /// Truthiness as used by switch-like confirmations.
    ///
    /// Booleans are themselves, numbers are true when non-zero, strings and
    /// collections when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(v) => *v,
            Value::Integer(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::String(v) => !v.is_empty(),
            Value::List(v) => !v.is_empty(),
            Value::Map(v) => !v.is_empty(),
            Value::Null => false,
        }
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Build a map value from `(key, value)` pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::List(v) => {
                let strs: Vec<String> = v.iter().map(|item| item.to_string()).collect();
                write!(f, "[{}]", strs.join(", "))
            }
            Value::Map(m) => {
                let strs: Vec<String> = m.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{{{}}}", strs.join(", "))
            }
            Value::Null => write!(f, "null"),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Integer(21).as_f64(), Some(21.0));
        assert_eq!(Value::Float(21.5).as_i64(), Some(21));
        assert_eq!(Value::Integer(300).as_u8(), None);
        assert_eq!(Value::from("heat").as_str(), Some("heat"));
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_map_get() {
        let v = Value::map([("hvac_mode", Value::from("heat")), ("target_temp", Value::from(22.0))]);
        assert_eq!(v.get("hvac_mode"), Some(&Value::from("heat")));
        assert_eq!(v.get("missing"), None);
        assert_eq!(Value::Bool(true).get("hvac_mode"), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Integer(3).is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn test_untagged_json() {
        let v: Value = serde_json::from_str(r#"{"speed": 64, "state": true, "preset_mode": "auto"}"#)
            .unwrap();
        assert_eq!(v.get("speed"), Some(&Value::Integer(64)));
        assert_eq!(v.get("state"), Some(&Value::Bool(true)));
        let text = serde_json::to_string(&Value::from(vec!["a", "b"])).unwrap();
        assert_eq!(text, r#"["a","b"]"#);
    }
}
