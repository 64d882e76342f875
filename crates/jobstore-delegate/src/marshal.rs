//! Per-dialect encoding of values whose wire shape is not portable.
//!
//! | Logical type | Standard                      | Integer-boolean (DB2 family, SQLite) |
//! |--------------|-------------------------------|--------------------------------------|
//! | boolean      | native boolean parameter      | integer parameter, true→1, false→0   |
//! | binary       | blob parameter, absent → NULL | inherited                            |
//! | timestamp    | integer epoch millis, absent → NULL | inherited                      |
//!
//! Timestamps must already be at millisecond precision (see
//! [`jobstore_core::types::truncate_to_millis`]); finer values are rejected
//! rather than rounded, so every encoded value decodes back unchanged.
//!
//! A dialect only overrides the rows of the table where it diverges; every
//! other rule comes from the provided methods of [`TypeMarshaller`].

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::value::{LogicalType, LogicalValue, SqlValue};

/// A wire value that does not belong to the expected logical type's domain.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot marshal {found} as {expected}: {detail}")]
pub struct MarshalError {
    pub expected: LogicalType,
    /// Wire type name of the offending value, or `"logical value"` when
    /// encoding failed.
    pub found: &'static str,
    pub detail: String,
}

impl MarshalError {
    pub fn new(expected: LogicalType, found: &SqlValue, detail: impl Into<String>) -> Self {
        Self {
            expected,
            found: found.type_name(),
            detail: detail.into(),
        }
    }

    /// A logical value outside the domain its rule can encode.
    pub fn unencodable(expected: LogicalType, detail: impl Into<String>) -> Self {
        Self {
            expected,
            found: "logical value",
            detail: detail.into(),
        }
    }
}

pub trait TypeMarshaller: Send + Sync + fmt::Debug {
    /// Short rule-set name, e.g. "standard".
    fn name(&self) -> &'static str;

    fn encode_bool(&self, value: bool) -> SqlValue {
        SqlValue::Bool(value)
    }

    /// Accepts a native boolean, or `0`/`1` from engines that surface
    /// boolean columns as integers.
    fn decode_bool(&self, value: &SqlValue) -> Result<bool, MarshalError> {
        match value {
            SqlValue::Bool(b) => Ok(*b),
            SqlValue::Int(0) => Ok(false),
            SqlValue::Int(1) => Ok(true),
            SqlValue::Int(other) => Err(MarshalError::new(
                LogicalType::Boolean,
                value,
                format!("integer {other} is neither 0 nor 1"),
            )),
            _ => Err(MarshalError::new(
                LogicalType::Boolean,
                value,
                "expected a boolean column",
            )),
        }
    }

    fn encode_bytes(&self, value: Option<&[u8]>) -> SqlValue {
        value.map_or(SqlValue::Null, |b| SqlValue::Blob(b.to_vec()))
    }

    fn decode_bytes(&self, value: &SqlValue) -> Result<Option<Vec<u8>>, MarshalError> {
        match value {
            SqlValue::Null => Ok(None),
            SqlValue::Blob(b) => Ok(Some(b.clone())),
            _ => Err(MarshalError::new(
                LogicalType::Binary,
                value,
                "expected a blob column",
            )),
        }
    }

    fn encode_timestamp(&self, value: Option<DateTime<Utc>>) -> Result<SqlValue, MarshalError> {
        let Some(t) = value else {
            return Ok(SqlValue::Null);
        };
        let nanos = t.timestamp_subsec_nanos();
        if nanos >= 1_000_000_000 || nanos % 1_000_000 != 0 {
            return Err(MarshalError::unencodable(
                LogicalType::Timestamp,
                format!("{t:?} is finer than millisecond precision"),
            ));
        }
        Ok(SqlValue::Int(t.timestamp_millis()))
    }

    fn decode_timestamp(&self, value: &SqlValue) -> Result<Option<DateTime<Utc>>, MarshalError> {
        match value {
            SqlValue::Null => Ok(None),
            SqlValue::Int(ms) => DateTime::from_timestamp_millis(*ms).map(Some).ok_or_else(|| {
                MarshalError::new(
                    LogicalType::Timestamp,
                    value,
                    format!("{ms} ms is outside the representable range"),
                )
            }),
            _ => Err(MarshalError::new(
                LogicalType::Timestamp,
                value,
                "expected an integer epoch-millisecond column",
            )),
        }
    }

    fn encode(&self, value: &LogicalValue) -> Result<SqlValue, MarshalError> {
        match value {
            LogicalValue::Boolean(b) => Ok(self.encode_bool(*b)),
            LogicalValue::Binary(b) => Ok(self.encode_bytes(b.as_deref())),
            LogicalValue::Timestamp(t) => self.encode_timestamp(*t),
        }
    }

    fn decode(&self, value: &SqlValue, ty: LogicalType) -> Result<LogicalValue, MarshalError> {
        match ty {
            LogicalType::Boolean => self.decode_bool(value).map(LogicalValue::Boolean),
            LogicalType::Binary => self.decode_bytes(value).map(LogicalValue::Binary),
            LogicalType::Timestamp => self.decode_timestamp(value).map(LogicalValue::Timestamp),
        }
    }
}

/// Standard-SQL rule set.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMarshaller;

impl TypeMarshaller for StandardMarshaller {
    fn name(&self) -> &'static str {
        "standard"
    }
}

/// Booleans as `1`/`0` integers, for engines without a native boolean
/// column type.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerBooleanMarshaller;

impl TypeMarshaller for IntegerBooleanMarshaller {
    fn name(&self) -> &'static str {
        "integer_boolean"
    }

    fn encode_bool(&self, value: bool) -> SqlValue {
        SqlValue::Int(if value { 1 } else { 0 })
    }

    fn decode_bool(&self, value: &SqlValue) -> Result<bool, MarshalError> {
        match value {
            SqlValue::Int(0) => Ok(false),
            SqlValue::Int(1) => Ok(true),
            SqlValue::Int(other) => Err(MarshalError::new(
                LogicalType::Boolean,
                value,
                format!("integer {other} is neither 0 nor 1"),
            )),
            _ => Err(MarshalError::new(
                LogicalType::Boolean,
                value,
                "expected an integer 0/1 column",
            )),
        }
    }
}
