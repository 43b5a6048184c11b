//! The `date` cast kind.
//!
//! Dates are stored without their time of day. Going in, a timestamp is
//! truncated to its calendar day: the row store keeps `YYYY-MM-DD` text, the
//! document store keeps the UTC millisecond timestamp of 00:00:00 that day.
//! Coming out, both forms become a timestamp at midnight. The truncation is
//! lossy by definition; the document form additionally drops sub-second
//! precision on the way out.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use trellis_types::Backend;

use super::Caster;
use crate::error::{Result, TrellisError};
use crate::value::Value;

/// Name the kind is registered under.
pub const KIND: &str = "date";

/// Builds the `date` caster with conversions for every backend.
pub fn caster() -> Caster {
    Caster::new(KIND)
        .cast_in_with(Backend::Sql, cast_in_sql)
        .cast_in_with(Backend::Document, cast_in_document)
        .cast_out_with(Backend::Sql, cast_out_sql)
        .cast_out_with(Backend::Document, cast_out_document)
}

fn expect_datetime(value: Value) -> Result<NaiveDateTime> {
    match value {
        Value::DateTime(datetime) => Ok(datetime),
        other => Err(TrellisError::Cast(format!(
            "date cast expects a datetime, found {}",
            other.kind()
        ))),
    }
}

fn cast_in_sql(value: Value) -> Result<Value> {
    let datetime = expect_datetime(value)?;
    Ok(Value::Text(datetime.date().format("%Y-%m-%d").to_string()))
}

fn cast_in_document(value: Value) -> Result<Value> {
    let start_of_day = expect_datetime(value)?.date().and_time(NaiveTime::MIN);
    Ok(Value::UtcDateTime(start_of_day.and_utc().timestamp_millis()))
}

fn cast_out_sql(value: Value) -> Result<Value> {
    match value {
        Value::Text(text) => parse_date_text(&text).map(Value::DateTime),
        Value::DateTime(datetime) => Ok(Value::DateTime(datetime)),
        other => Err(TrellisError::Cast(format!(
            "date cast expects date text from the sql backend, found {}",
            other.kind()
        ))),
    }
}

fn cast_out_document(value: Value) -> Result<Value> {
    match value {
        Value::UtcDateTime(millis) => DateTime::from_timestamp(millis.div_euclid(1000), 0)
            .map(|datetime| Value::DateTime(datetime.naive_utc()))
            .ok_or_else(|| TrellisError::Cast(format!("timestamp {millis} is out of range"))),
        other => Err(TrellisError::Cast(format!(
            "date cast expects a UTC datetime from the document backend, found {}",
            other.kind()
        ))),
    }
}

fn parse_date_text(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d").map(|date| date.and_time(NaiveTime::MIN))
        })
        .map_err(|error| TrellisError::Cast(format!("invalid date text {text:?}: {error}")))
}
