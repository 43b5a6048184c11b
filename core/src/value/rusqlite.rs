//! rusqlite implementations for Value

use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef};

use super::Value;
use crate::error::TrellisError;

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Value::Null => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Null)),
            Value::Bool(value) => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Integer(
                i64::from(*value),
            ))),
            Value::Integer(value) => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Integer(
                *value,
            ))),
            Value::Real(value) => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Real(*value))),
            Value::Text(value) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes()))),
            // Uncast timestamps are bound in SQLite's own text format
            Value::DateTime(value) => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Text(
                value.format("%Y-%m-%d %H:%M:%S").to_string(),
            ))),
            Value::UtcDateTime(millis) => Ok(ToSqlOutput::Owned(
                rusqlite::types::Value::Integer(*millis),
            )),
            Value::List(_) | Value::Document(_) => {
                Err(rusqlite::Error::ToSqlConversionFailure(Box::new(
                    TrellisError::Mapping(format!("cannot bind a {} value", self.kind())),
                )))
            }
        }
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let result = match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(value) => Value::Integer(value),
            ValueRef::Real(value) => Value::Real(value),
            ValueRef::Text(items) => Value::Text(String::from_utf8_lossy(items).into_owned()),
            ValueRef::Blob(items) => Value::Text(String::from_utf8_lossy(items).into_owned()),
        };
        Ok(result)
    }
}
