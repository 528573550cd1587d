//! Row-to-entity parsing and value-binding helpers.
//!
//! Repos convert `libsql::Row` (column-indexed) into typed entities and
//! entities back into `libsql::Value` parameter lists. Timestamps are written
//! as fixed-width RFC 3339 with nanoseconds so they sort lexically and
//! roundtrip exactly; `SQLite`'s `datetime('now')` format is still accepted
//! on read for rows created by column defaults.

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::Value;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DatabaseError;

/// Format a timestamp for storage.
#[must_use]
pub fn fmt_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00Z"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse an optional TEXT column as `Option<DateTime<Utc>>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with all inq-core enums that use `#[serde(rename_all = "snake_case")]`,
/// including their aliases.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string does not match any enum variant.
pub fn parse_enum<T: DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Query(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Decode a JSON TEXT column, treating NULL or empty as `T::default()`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the column holds malformed JSON.
pub fn parse_json_column<T: DeserializeOwned + Default>(
    s: Option<&str>,
) -> Result<T, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => serde_json::from_str(s)
            .map_err(|e| DatabaseError::Query(format!("Invalid JSON in column: {e}"))),
        _ => Ok(T::default()),
    }
}

/// Extract an optional JSON value from a TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string contains invalid JSON.
pub fn parse_optional_json(s: Option<&str>) -> Result<Option<serde_json::Value>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => {
            let val = serde_json::from_str(s)
                .map_err(|e| DatabaseError::Query(format!("Invalid JSON in column: {e}")))?;
            Ok(Some(val))
        }
        _ => Ok(None),
    }
}

/// Read an INTEGER column that must be non-negative.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` for negative values.
pub fn get_u64(row: &libsql::Row, idx: i32) -> Result<u64, DatabaseError> {
    let raw = row.get::<i64>(idx)?;
    u64::try_from(raw)
        .map_err(|_| DatabaseError::InvalidState(format!("negative counter {raw} in column {idx}")))
}

/// Nullable variant of [`get_u64`].
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` for negative values.
pub fn get_opt_u64(row: &libsql::Row, idx: i32) -> Result<Option<u64>, DatabaseError> {
    row.get::<Option<i64>>(idx)?
        .map(|raw| {
            u64::try_from(raw).map_err(|_| {
                DatabaseError::InvalidState(format!("negative counter {raw} in column {idx}"))
            })
        })
        .transpose()
}

// ---------------------------------------------------------------------------
// Parameter binding
// ---------------------------------------------------------------------------

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub fn opt_text(s: Option<&str>) -> Value {
    s.map_or(Value::Null, text)
}

pub fn opt_real(v: Option<f64>) -> Value {
    v.map_or(Value::Null, Value::Real)
}

pub fn datetime(dt: &DateTime<Utc>) -> Value {
    Value::Text(fmt_datetime(dt))
}

pub fn opt_datetime(dt: Option<&DateTime<Utc>>) -> Value {
    dt.map_or(Value::Null, datetime)
}

/// Bind a `u64` counter as SQLite INTEGER.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` if the value exceeds `i64::MAX`.
pub fn integer(v: u64) -> Result<Value, DatabaseError> {
    i64::try_from(v)
        .map(Value::Integer)
        .map_err(|_| DatabaseError::InvalidState(format!("counter {v} exceeds SQLite INTEGER")))
}

/// Nullable variant of [`integer`].
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` if the value exceeds `i64::MAX`.
pub fn opt_integer(v: Option<u64>) -> Result<Value, DatabaseError> {
    v.map_or(Ok(Value::Null), integer)
}

/// Serialize a value into a JSON TEXT parameter.
///
/// # Errors
///
/// Returns `DatabaseError::Other` if serialization fails.
pub fn json<T: Serialize + ?Sized>(v: &T) -> Result<Value, DatabaseError> {
    serde_json::to_string(v)
        .map(Value::Text)
        .map_err(|e| DatabaseError::Other(e.into()))
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Commit on success, roll back and surface the original error otherwise.
pub(crate) async fn commit_or_rollback(
    tx: libsql::Transaction,
    written: Result<(), DatabaseError>,
) -> Result<(), DatabaseError> {
    match written {
        Ok(()) => {
            tx.commit().await?;
            Ok(())
        }
        Err(e) => {
            tx.rollback().await?;
            Err(e)
        }
    }
}
