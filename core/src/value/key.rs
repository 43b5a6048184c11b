use std::fmt;

use super::Value;
use crate::error::{Result, TrellisError};

/// Hashable key value: primary keys, foreign keys and pivot link keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Int(i64),
    Text(String),
}

impl Key {
    /// Reads a key out of a stored value.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(value) => Ok(Key::Int(*value)),
            Value::Text(value) => Ok(Key::Text(value.clone())),
            other => Err(TrellisError::Mapping(format!(
                "a {} value cannot be used as a key",
                other.kind()
            ))),
        }
    }

    /// Like [`Key::from_value`], but NULL maps to `None`.
    pub fn from_nullable(value: &Value) -> Result<Option<Self>> {
        if value.is_null() {
            Ok(None)
        } else {
            Key::from_value(value).map(Some)
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(value) => write!(f, "{value}"),
            Key::Text(value) => f.write_str(value),
        }
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_owned())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

impl From<&Key> for Key {
    fn from(value: &Key) -> Self {
        value.clone()
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Int(value) => Value::Integer(value),
            Key::Text(value) => Value::Text(value),
        }
    }
}

impl From<&Key> for Value {
    fn from(key: &Key) -> Self {
        key.clone().into()
    }
}

impl TryFrom<&Value> for Key {
    type Error = TrellisError;

    fn try_from(value: &Value) -> Result<Self> {
        Key::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_value() {
        assert_eq!(Key::from_value(&Value::Integer(7)).unwrap(), Key::Int(7));
        assert_eq!(
            Key::from_value(&Value::from("abc")).unwrap(),
            Key::Text("abc".into())
        );
        assert!(matches!(
            Key::from_value(&Value::Real(1.5)),
            Err(TrellisError::Mapping(_))
        ));
    }

    #[test]
    fn test_nullable_key() {
        assert_eq!(Key::from_nullable(&Value::Null).unwrap(), None);
        assert_eq!(
            Key::from_nullable(&Value::Integer(1)).unwrap(),
            Some(Key::Int(1))
        );
    }
}
