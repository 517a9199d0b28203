//! Conversions between SQLDB values and SQLite storage classes, and error
//! mapping.

use rusqlite::ErrorCode;
use rusqlite::types::Value as SqlValue;
use sqldb_core::{DriverError, DriverErrorKind, Value};

/// Bind form of `value`. Booleans are stored as integers, JSON as text.
pub fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Double(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Json(j) => SqlValue::Text(j.to_string()),
    }
}

/// Read form of a stored value.
pub fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Int(i),
        SqlValue::Real(f) => Value::Double(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Bytes(b),
    }
}

/// Classify a rusqlite failure.
pub fn driver_error(err: rusqlite::Error) -> DriverError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let kind = match failure.code {
                ErrorCode::DatabaseBusy => DriverErrorKind::Busy,
                ErrorCode::DatabaseLocked => DriverErrorKind::Locked,
                ErrorCode::OperationInterrupted => DriverErrorKind::Interrupted,
                ErrorCode::CannotOpen | ErrorCode::NotADatabase => DriverErrorKind::Connection,
                _ => DriverErrorKind::Other,
            };
            let message = message.clone().unwrap_or_else(|| failure.to_string());
            DriverError::new(kind, message).with_code(failure.extended_code.to_string())
        }
        _ => DriverError::other(err.to_string()),
    }
}
