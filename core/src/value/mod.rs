//! Dynamic values
//!
//! One value type travels through conditions, attributes and command payloads
//! for every backend. Domain values (such as [`Value::DateTime`]) and
//! backend-native values (such as [`Value::UtcDateTime`]) live side by side;
//! the cast pipeline moves between them.

mod key;
#[cfg(feature = "rusqlite")]
mod rusqlite;

pub use key::Key;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Attribute map of one stored entity or one write.
pub type Attributes = BTreeMap<String, Value>;

/// Operator sub-document understood by the document store.
pub type Document = BTreeMap<String, Value>;

//------------------------------------------------------------------------------
// Value Definition
//------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    /// Domain timestamp, no time zone attached
    DateTime(NaiveDateTime),
    /// Document-store native UTC timestamp, in milliseconds since the epoch
    UtcDateTime(i64),
    List(Vec<Value>),
    Document(Document),
}

impl Value {
    /// Returns true if this value is NULL.
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for values the cast pipeline passes through untouched:
    /// NULL and the empty string.
    #[inline]
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    #[inline]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_datetime(&self) -> Option<&NaiveDateTime> {
        match self {
            Value::DateTime(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(document) => Some(document),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::DateTime(_) => "datetime",
            Value::UtcDateTime(_) => "utc datetime",
            Value::List(_) => "list",
            Value::Document(_) => "document",
        }
    }

    /// Orders two values of comparable kinds.
    ///
    /// Integers and reals compare numerically with each other. Values of
    /// unrelated kinds are unordered and yield `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Real(b)) => (*a as f64).partial_cmp(b),
            (Value::Real(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::UtcDateTime(a), Value::UtcDateTime(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) if a.len() == b.len() => {
                for (left, right) in a.iter().zip(b) {
                    match left.compare(right)? {
                        Ordering::Equal => continue,
                        unequal => return Some(unequal),
                    }
                }
                Some(Ordering::Equal)
            }
            (Value::Document(a), Value::Document(b)) => (a == b).then_some(Ordering::Equal),
            _ => None,
        }
    }

    /// Renders the value as MongoDB extended JSON.
    ///
    /// UTC timestamps become `{"$date": millis}`; domain timestamps render as
    /// ISO-8601 text since they carry no zone.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(value) => serde_json::Value::Bool(*value),
            Value::Integer(value) => serde_json::Value::from(*value),
            Value::Real(value) => serde_json::Number::from_f64(*value)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(value) => serde_json::Value::String(value.clone()),
            Value::DateTime(value) => {
                serde_json::Value::String(value.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            Value::UtcDateTime(millis) => serde_json::json!({ "$date": millis }),
            Value::List(values) => {
                serde_json::Value::Array(values.iter().map(Value::to_json).collect())
            }
            Value::Document(document) => serde_json::Value::Object(
                document
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Real(value) => write!(f, "{value}"),
            Value::Text(value) => write!(f, "{value:?}"),
            Value::DateTime(value) => write!(f, "{value}"),
            Value::UtcDateTime(millis) => write!(f, "UTCDateTime({millis})"),
            Value::List(_) | Value::Document(_) => write!(f, "{}", self.to_json()),
        }
    }
}

//------------------------------------------------------------------------------
// Conversions
//------------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::DateTime(value.and_time(NaiveTime::MIN))
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(!Value::from("x").is_empty());
        assert!(!Value::Integer(0).is_empty());
    }

    #[test]
    fn test_numeric_compare_across_kinds() {
        assert_eq!(
            Value::Integer(2).compare(&Value::Real(2.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Value::Real(1.5).compare(&Value::Integer(2)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Integer(1).compare(&Value::from("1")), None);
    }

    #[test]
    fn test_extended_json() {
        let mut document = Document::new();
        document.insert("at".into(), Value::UtcDateTime(86_400_000));
        document.insert("tags".into(), Value::from(vec!["a", "b"]));

        assert_eq!(
            Value::Document(document).to_json(),
            serde_json::json!({ "at": { "$date": 86_400_000 }, "tags": ["a", "b"] })
        );
    }

    #[test]
    fn test_naive_date_converts_to_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            Value::from(date),
            Value::DateTime(date.and_hms_opt(0, 0, 0).unwrap())
        );
    }
}
